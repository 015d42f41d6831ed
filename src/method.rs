//! The HTTP request method.

use std::fmt;
use std::str::FromStr;

use self::Method::{Connect, Delete, Get, Head, Options, Patch, Post, Put, Trace};

/// The request method (verb).
///
/// Covers the nine methods registered for HTTP/1.1 in
/// [RFC 7231](https://tools.ietf.org/html/rfc7231#section-4.1) plus PATCH.
/// Unregistered methods are rejected at parse time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// HEAD
    Head,
    /// DELETE
    Delete,
    /// CONNECT
    Connect,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
    /// PATCH
    Patch,
}

impl Method {
    /// The canonical wire spelling of the method.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Get => "GET",
            Put => "PUT",
            Post => "POST",
            Head => "HEAD",
            Delete => "DELETE",
            Connect => "CONNECT",
            Options => "OPTIONS",
            Trace => "TRACE",
            Patch => "PATCH",
        }
    }

    /// Whether a method is considered "safe", meaning the request is
    /// essentially read-only.
    pub fn safe(&self) -> bool {
        matches!(*self, Get | Head | Options | Trace)
    }

    /// Whether a method is considered "idempotent", meaning the request has
    /// the same result if executed multiple times.
    pub fn idempotent(&self) -> bool {
        self.safe() || matches!(*self, Put | Delete)
    }
}

impl Default for Method {
    fn default() -> Method {
        Get
    }
}

/// A method token outside the supported set.
#[derive(Debug)]
pub struct InvalidMethod(());

impl FromStr for Method {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Method, InvalidMethod> {
        match s {
            "GET" => Ok(Get),
            "PUT" => Ok(Put),
            "POST" => Ok(Post),
            "HEAD" => Ok(Head),
            "DELETE" => Ok(Delete),
            "CONNECT" => Ok(Connect),
            "OPTIONS" => Ok(Options),
            "TRACE" => Ok(Trace),
            "PATCH" => Ok(Patch),
            _ => Err(InvalidMethod(())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InvalidMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid HTTP method")
    }
}

impl std::error::Error for InvalidMethod {}

#[cfg(test)]
mod tests {
    use super::Method;
    use std::str::FromStr;

    #[test]
    fn parses_known_verbs() {
        for token in &[
            "GET", "PUT", "POST", "HEAD", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
        ] {
            let method = Method::from_str(token).unwrap();
            assert_eq!(method.as_str(), *token);
        }
    }

    #[test]
    fn rejects_unknown_and_lowercase() {
        assert!(Method::from_str("BREW").is_err());
        assert!(Method::from_str("get").is_err());
        assert!(Method::from_str("").is_err());
    }

    #[test]
    fn safety() {
        assert!(Method::Get.safe());
        assert!(!Method::Post.safe());
        assert!(Method::Delete.idempotent());
        assert!(!Method::Patch.idempotent());
    }
}
