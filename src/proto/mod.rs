//! Protocol plumbing: incremental parsing and connection driving.

pub mod conn;
pub(crate) mod date;
pub mod parse;

pub use self::conn::serve_connection;
pub use self::parse::{ParseEvent, RequestParser};
