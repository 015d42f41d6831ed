//! Cookie header helpers: decoding `Cookie`, encoding `Set-Cookie`.

use std::fmt;
use std::time::SystemTime;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::Error;
use crate::Result;

// Cookie-octet per RFC 6265 excludes controls, whitespace, DQUOTE, comma,
// semicolon and backslash; percent must round-trip through the decoder.
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

/// One `name=value` pair from a request `Cookie` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    /// The cookie name, as sent.
    pub name: String,
    /// The cookie value, percent-decoded.
    pub value: String,
}

impl Cookie {
    /// Decodes a request `Cookie` header into its pairs, in order.
    pub fn parse_header(raw: &str) -> Result<Vec<Cookie>> {
        let mut cookies = Vec::new();
        for pair in raw.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let eq = pair.find('=').ok_or_else(Error::new_header_value)?;
            let (name, value) = pair.split_at(eq);
            let value = percent_decode_str(&value[1..])
                .decode_utf8()
                .map_err(|_| Error::new_header_value())?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::new_header_value());
            }
            cookies.push(Cookie {
                name: name.to_owned(),
                value: value.into_owned(),
            });
        }
        Ok(cookies)
    }
}

/// The `SameSite` attribute of a `Set-Cookie` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    Lax,
    /// `SameSite=None`
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match *self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Builder for a `Set-Cookie` header value.
///
/// The value is percent-encoded on write; attributes are emitted in the
/// order the RFC lists them.
#[derive(Clone, Debug)]
pub struct SetCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    expires: Option<SystemTime>,
    http_only: bool,
    secure: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// Starts a cookie with just a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> SetCookie {
        SetCookie {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    /// Sets the `Domain` attribute.
    pub fn domain(mut self, domain: impl Into<String>) -> SetCookie {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Path` attribute.
    pub fn path(mut self, path: impl Into<String>) -> SetCookie {
        self.path = Some(path.into());
        self
    }

    /// Sets the `Expires` attribute.
    pub fn expires(mut self, at: SystemTime) -> SetCookie {
        self.expires = Some(at);
        self
    }

    /// Marks the cookie `HttpOnly`.
    pub fn http_only(mut self) -> SetCookie {
        self.http_only = true;
        self
    }

    /// Marks the cookie `Secure`.
    pub fn secure(mut self) -> SetCookie {
        self.secure = true;
        self
    }

    /// Sets the `SameSite` attribute.
    pub fn same_site(mut self, policy: SameSite) -> SetCookie {
        self.same_site = Some(policy);
        self
    }

    /// Renders the header value.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}",
            self.name,
            utf8_percent_encode(&self.value, COOKIE_VALUE)
        )?;
        if let Some(ref domain) = self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(ref path) = self.path {
            write!(f, "; Path={}", path)?;
        }
        if let Some(at) = self.expires {
            write!(f, "; Expires={}", httpdate::fmt_http_date(at))?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(policy) = self.same_site {
            write!(f, "; SameSite={}", policy.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn parses_request_cookies_in_order() {
        let cookies = Cookie::parse_header("sid=abc123; theme=dark%20mode").unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "sid");
        assert_eq!(cookies[0].value, "abc123");
        assert_eq!(cookies[1].value, "dark mode");
    }

    #[test]
    fn value_may_contain_equals() {
        let cookies = Cookie::parse_header("token=a=b=c").unwrap();
        assert_eq!(cookies[0].value, "a=b=c");
    }

    #[test]
    fn rejects_pairs_without_equals() {
        assert!(Cookie::parse_header("bare").is_err());
        assert!(Cookie::parse_header("=nameless").is_err());
    }

    #[test]
    fn encodes_attributes_in_order() {
        let when = UNIX_EPOCH + Duration::from_secs(784111777);
        let cookie = SetCookie::new("sid", "a b;c")
            .domain("example.test")
            .path("/app")
            .expires(when)
            .http_only()
            .secure()
            .same_site(SameSite::Lax);
        assert_eq!(
            cookie.encode(),
            "sid=a%20b%3Bc; Domain=example.test; Path=/app; \
             Expires=Sun, 06 Nov 1994 08:49:37 GMT; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn round_trips_through_decoder() {
        let encoded = SetCookie::new("k", "100%; done").encode();
        let value = encoded.split('=').nth(1).unwrap();
        let decoded = percent_decode_str(value).decode_utf8().unwrap();
        assert_eq!(decoded, "100%; done");
    }
}
