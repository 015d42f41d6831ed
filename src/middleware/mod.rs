//! Ready-made middleware built on the contracts the core exposes:
//! transforms, taps, typed header views and the per-request user bag.

pub mod body;
pub mod cache;
pub mod compress;
pub mod cookies;
pub mod vhost;

pub use self::body::{json_body, JsonBody};
pub use self::cache::ResponseCache;
pub use self::compress::compress;
pub use self::cookies::{cookies, RequestCookies};
pub use self::vhost::virtual_host;
