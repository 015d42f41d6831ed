//! Origin-form request-target parsing.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::error::Error;
use crate::Result;

/// A parsed origin-form request target: path, query, optional fragment.
///
/// Query values are percent-decoded; keys are not. A duplicate query key
/// overwrites the earlier value in place, keeping its original position —
/// the last duplicate wins. This mirrors how lookups behave even though
/// HTTP semantics are looser about repeated keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uri {
    path: String,
    query: Vec<(String, String)>,
    fragment: Option<String>,
}

impl Uri {
    /// Parses an origin-form target (`/path?k=v#frag`).
    ///
    /// Anything not starting with `/` fails, as does a query pair without
    /// exactly one `=`.
    pub fn parse(target: &str) -> Result<Uri> {
        if !target.starts_with('/') {
            return Err(Error::new_request_line());
        }
        let (rest, fragment) = match target.find('#') {
            Some(at) => (&target[..at], Some(target[at + 1..].to_owned())),
            None => (target, None),
        };
        let (path, raw_query) = match rest.find('?') {
            Some(at) => (&rest[..at], Some(&rest[at + 1..])),
            None => (rest, None),
        };
        let mut query = Vec::new();
        if let Some(raw) = raw_query {
            for pair in raw.split('&') {
                if pair.bytes().filter(|&b| b == b'=').count() != 1 {
                    return Err(Error::new_request_line());
                }
                let eq = pair.find('=').expect("pair has one equals");
                let key = &pair[..eq];
                let value = percent_decode_str(&pair[eq + 1..])
                    .decode_utf8()
                    .map_err(|_| Error::new_request_line())?;
                match query.iter_mut().find(|(k, _)| k == key) {
                    Some((_, v)) => *v = value.into_owned(),
                    None => query.push((key.to_owned(), value.into_owned())),
                }
            }
        }
        Ok(Uri {
            path: path.to_owned(),
            query,
            fragment,
        })
    }

    /// The path component; always non-empty and `/`-prefixed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The decoded value for a query key.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All query pairs in first-seen key order.
    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The fragment, if one was sent (rare on the wire, parsed anyway).
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl Default for Uri {
    fn default() -> Uri {
        Uri {
            path: "/".to_owned(),
            query: Vec::new(),
            fragment: None,
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            write!(f, "{}{}={}", if i == 0 { '?' } else { '&' }, k, v)?;
        }
        if let Some(ref fragment) = self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}
