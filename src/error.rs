//! Error and Result module.

use std::error::Error as StdError;
use std::fmt;

/// Result type often returned from methods that can have wicket `Error`s.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur handling HTTP streams.
///
/// The concrete kind is intentionally private; use the `is_*` predicates
/// to classify an error, and [`Error::message`] for the standalone text.
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// Malformed bytes were received where HTTP syntax was expected.
    Parse(Parse),
    /// The request used an HTTP version other than 1.1. Carries the token.
    Version(String),
    /// An `io::Error` occurred while reading or writing a network stream.
    Io,
    /// The peer closed the connection before a message completed.
    IncompleteMessage,
    /// A programmer error: the caller violated a documented invariant.
    User(User),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parse {
    RequestLine,
    Headers,
    Body,
    HeaderValue,
}

#[derive(Debug)]
pub(crate) enum User {
    /// A response method was called while the writer was in the wrong state.
    State,
    /// A route pattern declared the same parameter name twice.
    DuplicateParam,
    /// A route pattern used a name from the reserved `__` namespace.
    ReservedParam,
    /// A route pattern segment contained characters outside `[A-Za-z0-9_-]`.
    InvalidParam,
    /// A `*` wildcard appeared somewhere other than the final segment.
    WildcardPosition,
    /// A status code without a canonical phrase was written without one.
    UnknownStatus,
    /// More body bytes were written than the declared Content-Length.
    BodyOverflow,
    /// The body ended short of the declared Content-Length.
    BodyUnderflow,
    /// Body bytes arrived but no body object was installed on the request.
    MissingBody,
    /// A template or serialized payload failed to render.
    Render,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(ErrorImpl { kind, cause: None }),
        }
    }

    pub(crate) fn with<C: Into<Cause>>(mut self, cause: C) -> Error {
        self.inner.cause = Some(cause.into());
        self
    }

    pub(crate) fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    /// Returns true if this was an HTTP syntax error.
    pub fn is_parse(&self) -> bool {
        matches!(self.inner.kind, Kind::Parse(_))
    }

    /// Returns true if the request used an unsupported HTTP version.
    pub fn is_version(&self) -> bool {
        matches!(self.inner.kind, Kind::Version(_))
    }

    /// Returns true if this error wraps a transport `io::Error`.
    pub fn is_io(&self) -> bool {
        matches!(self.inner.kind, Kind::Io)
    }

    /// Returns true if the connection closed before a message completed.
    pub fn is_incomplete_message(&self) -> bool {
        matches!(self.inner.kind, Kind::IncompleteMessage)
    }

    /// Returns true if this error was caused by user code violating an
    /// invariant (wrong state transition, bad route pattern, and so on).
    pub fn is_user(&self) -> bool {
        matches!(self.inner.kind, Kind::User(_))
    }

    /// The version token of the request, if this is a version error.
    pub fn version_token(&self) -> Option<&str> {
        match self.inner.kind {
            Kind::Version(ref token) => Some(token),
            _ => None,
        }
    }

    /// Consumes the error, returning its cause.
    pub fn into_cause(self) -> Option<Box<dyn StdError + Send + Sync>> {
        self.inner.cause
    }

    pub(crate) fn new_request_line() -> Error {
        Error::new(Kind::Parse(Parse::RequestLine))
    }

    pub(crate) fn new_header_syntax() -> Error {
        Error::new(Kind::Parse(Parse::Headers))
    }

    pub(crate) fn new_body_syntax() -> Error {
        Error::new(Kind::Parse(Parse::Body))
    }

    pub(crate) fn new_header_value() -> Error {
        Error::new(Kind::Parse(Parse::HeaderValue))
    }

    pub(crate) fn new_version(token: &str) -> Error {
        Error::new(Kind::Version(token.to_owned()))
    }

    pub(crate) fn new_io(cause: std::io::Error) -> Error {
        Error::new(Kind::Io).with(cause)
    }

    pub(crate) fn new_incomplete() -> Error {
        Error::new(Kind::IncompleteMessage)
    }

    fn new_user(user: User) -> Error {
        Error::new(Kind::User(user))
    }

    pub(crate) fn new_user_state() -> Error {
        Error::new_user(User::State)
    }

    pub(crate) fn new_user_duplicate_param() -> Error {
        Error::new_user(User::DuplicateParam)
    }

    pub(crate) fn new_user_reserved_param() -> Error {
        Error::new_user(User::ReservedParam)
    }

    pub(crate) fn new_user_invalid_param() -> Error {
        Error::new_user(User::InvalidParam)
    }

    pub(crate) fn new_user_wildcard_position() -> Error {
        Error::new_user(User::WildcardPosition)
    }

    pub(crate) fn new_user_unknown_status() -> Error {
        Error::new_user(User::UnknownStatus)
    }

    pub(crate) fn new_user_body_overflow() -> Error {
        Error::new_user(User::BodyOverflow)
    }

    pub(crate) fn new_user_body_underflow() -> Error {
        Error::new_user(User::BodyUnderflow)
    }

    pub(crate) fn new_user_missing_body() -> Error {
        Error::new_user(User::MissingBody)
    }

    pub(crate) fn new_user_render<E: Into<Cause>>(cause: E) -> Error {
        Error::new_user(User::Render).with(cause)
    }

    /// The error's standalone message, without the message from the source.
    pub fn message(&self) -> impl fmt::Display + '_ {
        self.description()
    }

    fn description(&self) -> &str {
        match self.inner.kind {
            Kind::Parse(Parse::RequestLine) => "invalid HTTP request line parsed",
            Kind::Parse(Parse::Headers) => "invalid HTTP header parsed",
            Kind::Parse(Parse::Body) => "invalid HTTP body parsed",
            Kind::Parse(Parse::HeaderValue) => "invalid HTTP header value parsed",
            Kind::Version(_) => "unsupported HTTP version",
            Kind::Io => "connection error",
            Kind::IncompleteMessage => "connection closed before message completed",
            Kind::User(User::State) => "response used in the wrong state",
            Kind::User(User::DuplicateParam) => "route pattern declares a parameter twice",
            Kind::User(User::ReservedParam) => "route parameter name is reserved",
            Kind::User(User::InvalidParam) => "route parameter name contains invalid characters",
            Kind::User(User::WildcardPosition) => "wildcard must be the final pattern segment",
            Kind::User(User::UnknownStatus) => "unknown status code written without a phrase",
            Kind::User(User::BodyOverflow) => "body longer than the declared content length",
            Kind::User(User::BodyUnderflow) => "body ended short of the declared content length",
            Kind::User(User::MissingBody) => "body bytes received but no body was installed",
            Kind::User(User::Render) => "failed to render the response payload",
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_tuple("wicket::Error");
        f.field(&self.inner.kind);
        if let Some(ref cause) = self.inner.cause {
            f.field(cause);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref cause) = self.inner.cause {
            write!(f, "{}: {}", self.description(), cause)
        } else {
            f.write_str(self.description())
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::new_io(err)
    }
}

#[doc(hidden)]
trait AssertSendSync: Send + Sync + 'static {}
#[doc(hidden)]
impl AssertSendSync for Error {}
