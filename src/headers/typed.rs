//! Typed decoders for composite header values.
//!
//! Every decoder is strict: a present but malformed value fails with a
//! header-value syntax error rather than being silently dropped.

use crate::error::Error;
use crate::Result;

/// A header with a well-known name and a typed decoded form.
pub trait TypedHeader: Sized {
    /// The lowercase header name this view decodes.
    const NAME: &'static str;

    /// Decodes the raw wire value.
    fn parse(raw: &str) -> Result<Self>;
}

/// One span of a byte `Range`; either edge may be open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteSpan {
    /// First byte position, or `None` for a suffix span (`-500`).
    pub from: Option<u64>,
    /// Last byte position, or `None` for an open end (`500-`).
    pub to: Option<u64>,
}

/// The `Range` request header. Only the `bytes` unit is recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Range {
    /// The requested spans, in the order sent.
    pub spans: Vec<ByteSpan>,
}

impl TypedHeader for Range {
    const NAME: &'static str = "range";

    fn parse(raw: &str) -> Result<Range> {
        let eq = raw.find('=').ok_or_else(Error::new_header_value)?;
        let (unit, rest) = raw.split_at(eq);
        if unit.trim() != "bytes" {
            return Err(Error::new_header_value());
        }
        let mut spans = Vec::new();
        for span in rest[1..].split(',') {
            spans.push(parse_span(span.trim())?);
        }
        if spans.is_empty() {
            return Err(Error::new_header_value());
        }
        Ok(Range { spans })
    }
}

fn parse_span(span: &str) -> Result<ByteSpan> {
    let mut parts = span.splitn(2, '-');
    let from = parts.next().unwrap_or("");
    let to = parts.next().ok_or_else(Error::new_header_value)?;
    let from = parse_edge(from)?;
    let to = parse_edge(to)?;
    if from.is_none() && to.is_none() {
        return Err(Error::new_header_value());
    }
    Ok(ByteSpan { from, to })
}

fn parse_edge(s: &str) -> Result<Option<u64>> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse::<u64>()
        .map(Some)
        .map_err(|_| Error::new_header_value())
}

/// The `Content-Range` header. Only the `bytes` unit is recognized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte position of the span.
    pub start: u64,
    /// Last byte position of the span.
    pub end: u64,
    /// Complete length, or `None` when sent as `*`.
    pub size: Option<u64>,
}

impl TypedHeader for ContentRange {
    const NAME: &'static str = "content-range";

    fn parse(raw: &str) -> Result<ContentRange> {
        let mut parts = raw.trim().splitn(2, ' ');
        let unit = parts.next().unwrap_or("");
        let rest = parts.next().ok_or_else(Error::new_header_value)?;
        if unit != "bytes" {
            return Err(Error::new_header_value());
        }
        let slash = rest.find('/').ok_or_else(Error::new_header_value)?;
        let (span, size) = rest.split_at(slash);
        let size = &size[1..];
        let dash = span.find('-').ok_or_else(Error::new_header_value)?;
        let (start, end) = span.split_at(dash);
        let start = start.parse().map_err(|_| Error::new_header_value())?;
        let end = end[1..].parse().map_err(|_| Error::new_header_value())?;
        let size = if size == "*" {
            None
        } else {
            Some(size.parse().map_err(|_| Error::new_header_value())?)
        };
        Ok(ContentRange { start, end, size })
    }
}

/// A comma-separated token list; elements are trimmed and lowercased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<String>,
}

impl TokenList {
    pub(crate) fn parse_tokens(raw: &str) -> Result<TokenList> {
        let mut tokens = Vec::new();
        for token in raw.split(',') {
            let token = token.trim();
            if token.is_empty() {
                return Err(Error::new_header_value());
            }
            tokens.push(token.to_ascii_lowercase());
        }
        Ok(TokenList { tokens })
    }

    /// The decoded tokens, in order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether the exact token is present.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Whether a token is present, ignoring any `;`-attached parameters
    /// (so `gzip;q=0.8` accepts `gzip`).
    pub fn accepts(&self, token: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| t.split(';').next().map(str::trim) == Some(token))
    }
}

macro_rules! token_headers {
    (
        $(
            ($name:expr, $konst:ident, $doc:expr);
        )+
    ) => {
        $(
            #[doc = $doc]
            #[derive(Clone, Debug, PartialEq, Eq)]
            pub struct $konst(pub TokenList);

            impl TypedHeader for $konst {
                const NAME: &'static str = $name;

                fn parse(raw: &str) -> Result<$konst> {
                    TokenList::parse_tokens(raw).map($konst)
                }
            }
        )+
    }
}

token_headers! {
    ("content-encoding", ContentEncoding, "The `Content-Encoding` header as a token list.");
    ("transfer-encoding", TransferEncoding, "The `Transfer-Encoding` header as a token list.");
    ("accept-encoding", AcceptEncoding, "The `Accept-Encoding` header as a token list.");
    ("connection", ConnectionOptions, "The `Connection` header as a token list.");
}

/// The `Content-Type` header: a media type plus up to two recognized
/// parameters (`charset`, `boundary`). Unknown parameter keys fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentType {
    /// The `type/subtype` essence, lowercased.
    pub media_type: String,
    /// The `charset` parameter, if sent.
    pub charset: Option<String>,
    /// The `boundary` parameter, if sent.
    pub boundary: Option<String>,
}

impl TypedHeader for ContentType {
    const NAME: &'static str = "content-type";

    fn parse(raw: &str) -> Result<ContentType> {
        let mut parts = raw.split(';');
        let media_type = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        if media_type.is_empty() || !media_type.contains('/') {
            return Err(Error::new_header_value());
        }
        let mut decoded = ContentType {
            media_type,
            charset: None,
            boundary: None,
        };
        let mut seen = 0;
        for param in parts {
            seen += 1;
            if seen > 2 {
                return Err(Error::new_header_value());
            }
            let eq = param.find('=').ok_or_else(Error::new_header_value)?;
            let (key, value) = param.split_at(eq);
            let value = value[1..].trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "charset" => decoded.charset = Some(value.to_owned()),
                "boundary" => decoded.boundary = Some(value.to_owned()),
                _ => return Err(Error::new_header_value()),
            }
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_spans() {
        let range = Range::parse("bytes=0-99,200-,-500").unwrap();
        assert_eq!(
            range.spans,
            vec![
                ByteSpan { from: Some(0), to: Some(99) },
                ByteSpan { from: Some(200), to: None },
                ByteSpan { from: None, to: Some(500) },
            ]
        );
    }

    #[test]
    fn range_rejects_bad_unit_and_empty_span() {
        assert!(Range::parse("items=0-1").is_err());
        assert!(Range::parse("bytes=-").is_err());
        assert!(Range::parse("bytes=abc-1").is_err());
        assert!(Range::parse("bytes").is_err());
    }

    #[test]
    fn content_range_sizes() {
        let cr = ContentRange::parse("bytes 0-99/1234").unwrap();
        assert_eq!((cr.start, cr.end, cr.size), (0, 99, Some(1234)));
        let cr = ContentRange::parse("bytes 10-19/*").unwrap();
        assert_eq!(cr.size, None);
        assert!(ContentRange::parse("bytes 0-99").is_err());
        assert!(ContentRange::parse("pages 0-99/3").is_err());
    }

    #[test]
    fn token_lists_trim_and_lowercase() {
        let list = TokenList::parse_tokens(" GZip , deflate ").unwrap();
        assert_eq!(list.tokens(), &["gzip", "deflate"]);
        assert!(list.contains("gzip"));
        assert!(TokenList::parse_tokens("gzip,,deflate").is_err());
    }

    #[test]
    fn token_accepts_ignores_params() {
        let list = TokenList::parse_tokens("gzip;q=0.8, br").unwrap();
        assert!(list.accepts("gzip"));
        assert!(!list.contains("gzip"));
        assert!(list.accepts("br"));
    }

    #[test]
    fn content_type_params() {
        let ct = ContentType::parse("Text/HTML; charset=utf-8").unwrap();
        assert_eq!(ct.media_type, "text/html");
        assert_eq!(ct.charset.as_deref(), Some("utf-8"));

        let ct = ContentType::parse("multipart/form-data; boundary=xyz; charset=ascii").unwrap();
        assert_eq!(ct.boundary.as_deref(), Some("xyz"));

        assert!(ContentType::parse("text/plain; nope=1").is_err());
        assert!(ContentType::parse("text/plain; a=1; b=2; c=3").is_err());
        assert!(ContentType::parse("plain").is_err());
    }
}
