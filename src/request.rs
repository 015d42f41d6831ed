//! The incoming request.

use std::fmt;

use crate::body::Body;
use crate::error::Error;
use crate::ext::Extensions;
use crate::headers::HeaderMap;
use crate::method::Method;
use crate::uri::Uri;
use crate::version::Version;
use crate::Result;

/// An HTTP request, filled in incrementally by the parser.
///
/// One `Request` lives for the whole connection; it is reset to defaults
/// between pipelined requests rather than reallocated.
#[derive(Debug, Default)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) version: Version,
    pub(crate) target: String,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Body>,
    pub(crate) extensions: Extensions,
}

impl Request {
    /// Creates an empty request awaiting its first bytes.
    pub fn new() -> Request {
        Request::default()
    }

    /// The request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The protocol version (always HTTP/1.1).
    pub fn version(&self) -> Version {
        self.version
    }

    /// The raw request-target exactly as received.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The parsed request target.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The installed body, if any.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Installs a body object for the parser to fill.
    pub fn set_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Removes and returns the body.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// The per-request user-data bag.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable access to the user-data bag.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// The declared `Content-Length`, if the header is present.
    ///
    /// A malformed value is a header-value syntax error.
    pub fn content_length(&self) -> Result<Option<usize>> {
        match self.headers.get("content-length") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map(Some)
                .map_err(|_| Error::new_header_value()),
            None => Ok(None),
        }
    }

    /// Resets every field to its default, ready for the next pipelined
    /// request on the same connection.
    pub(crate) fn reset(&mut self) {
        self.method = Method::default();
        self.version = Version::default();
        self.target.clear();
        self.uri = Uri::default();
        self.headers.clear();
        self.body = None;
        self.extensions.clear();
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.target, self.version)
    }
}
