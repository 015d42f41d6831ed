#![deny(missing_debug_implementations)]
#![warn(missing_docs)]
#![cfg_attr(test, deny(rust_2018_idioms))]

//! # wicket
//!
//! A small and correct HTTP/1.1 server library built from three pieces:
//!
//! - an **incremental request parser** that turns a raw byte stream into
//!   requests, event by event, with pipelining support;
//! - a **composable router**: ordered rules, `:name` parameters, trailing
//!   wildcards, nested sub-routers and short-circuiting middleware chains;
//! - a **streaming response writer** that picks its transfer encoding at
//!   send time, frames chunked bodies, and lets middleware stack body
//!   transforms (compression, cache tees) and observer taps.
//!
//! The crate speaks HTTP/1.1 only. Listeners stay thin: anything
//! `AsyncRead + AsyncWrite` can be served with
//! [`serve_connection`](proto::serve_connection), and the bundled
//! [`Server`] is just a TCP accept loop around it.
//!
//! ```no_run
//! use wicket::{Router, Server, ServerConfig, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> wicket::Result<()> {
//!     let mut router = Router::new();
//!     router.get("/hello", |_m, _req, res| {
//!         Box::pin(async move {
//!             res.text(StatusCode::OK, "ok").await?;
//!             Ok(false)
//!         })
//!     })?;
//!     Server::new(router, ServerConfig::default()).run().await
//! }
//! ```

pub use crate::error::{Error, Result};

pub mod body;
mod error;
pub mod ext;
pub mod headers;
pub mod method;
pub mod middleware;
pub mod mime;
pub mod proto;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod status;
pub mod uri;
pub mod util;
pub mod version;

pub use crate::body::Body;
pub use crate::ext::Extensions;
pub use crate::headers::HeaderMap;
pub use crate::method::Method;
pub use crate::proto::{serve_connection, ParseEvent, RequestParser};
pub use crate::request::Request;
pub use crate::response::{
    BodyTransform, ConnectionPreference, Response, ResponseOptions, Template, WriteState,
};
pub use crate::router::{Callback, Handler, PathMatch, Pattern, Router};
pub use crate::server::{Server, ServerConfig};
pub use crate::status::StatusCode;
pub use crate::uri::Uri;
pub use crate::version::Version;
