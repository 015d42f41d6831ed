//! Virtual-host routing on the `Host` header.

use std::sync::Arc;

use crate::router::{Callback, Router};

// Host headers may carry a port; only the name part selects the vhost.
fn host_name(raw: &str) -> &str {
    raw.split(':').next().unwrap_or(raw).trim()
}

/// Routes requests whose `Host` matches `host` through `router`.
///
/// On a match the inner router is dispatched with the request's own path
/// passed explicitly, and the outer chain stops regardless of how the
/// inner chain ended. Requests for other hosts pass through.
pub fn virtual_host(host: impl Into<String>, router: Router) -> Callback {
    let host = host.into();
    let router = Arc::new(router);
    Box::new(move |_m, req, res| {
        let host = host.clone();
        let router = Arc::clone(&router);
        Box::pin(async move {
            let matches = req
                .headers()
                .get("host")
                .map(|raw| host_name(raw).eq_ignore_ascii_case(&host))
                .unwrap_or(false);
            if !matches {
                return Ok(true);
            }
            let path = req.uri().path().to_owned();
            router.handle_path(&path, req, res).await?;
            Ok(false)
        })
    })
}
