//! Cached `Date` header value.
//!
//! Rendering an RFC 1123 date per response is wasteful when the clock only
//! ticks once a second; each thread keeps the rendered value and re-renders
//! only when it goes stale.

use std::cell::RefCell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// "Sun, 06 Nov 1994 08:49:37 GMT".len()
pub(crate) const DATE_VALUE_LENGTH: usize = 29;

struct CachedDate {
    value: String,
    next_update: SystemTime,
}

thread_local!(static CACHED: RefCell<CachedDate> = RefCell::new(CachedDate::new()));

impl CachedDate {
    fn new() -> CachedDate {
        let mut cache = CachedDate {
            value: String::with_capacity(DATE_VALUE_LENGTH),
            next_update: UNIX_EPOCH,
        };
        cache.update(SystemTime::now());
        cache
    }

    fn check(&mut self) {
        let now = SystemTime::now();
        if now >= self.next_update {
            self.update(now);
        }
    }

    fn update(&mut self, now: SystemTime) {
        self.value = httpdate::fmt_http_date(now);
        debug_assert_eq!(self.value.len(), DATE_VALUE_LENGTH);
        self.next_update = now + Duration::from_secs(1);
    }
}

/// The current `Date` header value.
pub(crate) fn header_value() -> String {
    CACHED.with(|cache| {
        let mut cache = cache.borrow_mut();
        cache.check();
        cache.value.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_has_rfc1123_shape() {
        let value = header_value();
        assert_eq!(value.len(), DATE_VALUE_LENGTH);
        assert!(value.ends_with(" GMT"));
    }
}
