//! Request cookie decoding into the user bag.

use crate::headers::Cookie;
use crate::router::Callback;

/// The decoded request cookies, published by [`cookies`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestCookies(pub Vec<Cookie>);

impl RequestCookies {
    /// The value of the first cookie with a name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }
}

/// Decodes the `Cookie` header into [`RequestCookies`].
///
/// A malformed header is logged and skipped; cookie jars full of junk are
/// a client problem, not a reason to fail the request.
pub fn cookies() -> Callback {
    Box::new(|_m, req, _res| {
        Box::pin(async move {
            if let Some(raw) = req.headers().get("cookie") {
                match Cookie::parse_header(raw) {
                    Ok(parsed) => {
                        req.extensions_mut().insert(RequestCookies(parsed));
                    }
                    Err(err) => log::debug!("ignoring malformed cookie header: {}", err),
                }
            }
            Ok(true)
        })
    })
}
