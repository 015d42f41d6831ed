//! The HTTP version.

use std::fmt;

/// The protocol version of a message.
///
/// Only HTTP/1.1 is spoken; any other token on the request line is rejected
/// with a version error before routing happens.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Version {
    /// `HTTP/1.1`
    Http11,
}

impl Version {
    pub(crate) const WIRE: &'static str = "HTTP/1.1";
}

impl Default for Version {
    fn default() -> Version {
        Version::Http11
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Version::WIRE)
    }
}
