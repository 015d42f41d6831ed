//! Response caching over the TTL cache, fed by taps and a tee transform.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::method::Method;
use crate::response::TeeTransform;
use crate::router::Callback;
use crate::status::StatusCode;
use crate::util::TtlCache;

/// A snapshot of one GET response, replayable for later requests.
#[derive(Clone, Debug)]
struct CachedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

// Connection-specific headers never belong in a snapshot; framing headers
// are recomputed on replay.
fn is_cacheable_header(name: &str) -> bool {
    !matches!(
        name.to_ascii_lowercase().as_str(),
        "server" | "date" | "connection" | "content-length" | "transfer-encoding"
    )
}

/// An in-memory cache of GET responses keyed by request target.
///
/// On a miss the middleware subscribes to the response's status and header
/// taps and installs a tee transform; when the body finishes, the snapshot
/// is stored for the configured TTL. On a hit the snapshot is replayed and
/// the chain short-circuits.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    cache: Arc<TtlCache<String, CachedResponse>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Creates a cache whose entries live for `ttl`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(ttl: Duration) -> ResponseCache {
        ResponseCache {
            cache: Arc::new(TtlCache::new()),
            ttl,
        }
    }

    /// The number of live snapshots.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no snapshots are stored.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// The middleware callback serving and recording snapshots.
    pub fn middleware(&self) -> Callback {
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        Box::new(move |_m, req, res| {
            let cache = Arc::clone(&cache);
            Box::pin(async move {
                if req.method() != Method::Get {
                    return Ok(true);
                }
                let key = req.target().to_owned();
                if let Some(hit) = cache.get(&key) {
                    log::debug!("cache hit for {}", key);
                    res.set_body_size(hit.body.len() as u64);
                    let status = StatusCode::from_u16(hit.status)
                        .map_err(|_| crate::error::Error::new_user_unknown_status())?;
                    res.write_status(status).await?;
                    for (name, value) in &hit.headers {
                        res.write_header(name, value).await?;
                    }
                    res.write_body(&hit.body).await?;
                    res.end().await?;
                    return Ok(false);
                }

                let status = Arc::new(Mutex::new(None::<u16>));
                let headers = Arc::new(Mutex::new(Vec::new()));
                let body = Arc::new(Mutex::new(Vec::new()));

                let seen = Arc::clone(&status);
                res.on_status(move |code| {
                    *seen.lock().unwrap() = Some(code.as_u16());
                });
                let recorded = Arc::clone(&headers);
                res.on_header(move |name, value| {
                    if is_cacheable_header(name) {
                        recorded
                            .lock()
                            .unwrap()
                            .push((name.to_owned(), value.to_owned()));
                    }
                });

                let on_finish = {
                    let status = Arc::clone(&status);
                    let headers = Arc::clone(&headers);
                    let body = Arc::clone(&body);
                    move || {
                        let status = match *status.lock().unwrap() {
                            Some(status) => status,
                            None => return,
                        };
                        let snapshot = CachedResponse {
                            status,
                            headers: headers.lock().unwrap().clone(),
                            body: body.lock().unwrap().clone(),
                        };
                        cache.insert(key, snapshot, ttl);
                    }
                };
                res.push_body_transform(Box::new(TeeTransform::new(body, on_finish)));
                Ok(true)
            })
        })
    }
}
