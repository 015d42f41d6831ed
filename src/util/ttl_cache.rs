//! A key/value cache whose entries expire at absolute deadlines.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use super::scheduler::{Scheduler, TaskHandle};

struct Slot<V> {
    value: V,
    generation: u64,
    timer: TaskHandle,
}

/// A TTL cache backed by the [`Scheduler`].
///
/// Every insert schedules a removal at `now + ttl`. Replacing or removing
/// a key bumps its generation so a stale timer that fires anyway finds
/// nothing to do.
pub struct TtlCache<K, V> {
    map: Arc<Mutex<HashMap<K, Slot<V>>>>,
    scheduler: Scheduler,
    generation: Mutex<u64>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Creates an empty cache and its expiry scheduler.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> TtlCache<K, V> {
        TtlCache {
            map: Arc::new(Mutex::new(HashMap::new())),
            scheduler: Scheduler::new(),
            generation: Mutex::new(0),
        }
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry
    /// and cancelling its expiry.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let generation = {
            let mut gen = self.generation.lock().unwrap();
            *gen += 1;
            *gen
        };
        let timer = {
            let map = Arc::clone(&self.map);
            let key = key.clone();
            self.scheduler.schedule(Instant::now() + ttl, move || {
                let mut map = map.lock().unwrap();
                // The generation guards against a timer that fired while
                // its entry was being replaced.
                if map.get(&key).map(|slot| slot.generation) == Some(generation) {
                    map.remove(&key);
                }
            })
        };
        let old = self.map.lock().unwrap().insert(
            key,
            Slot {
                value,
                generation,
                timer,
            },
        );
        if let Some(old) = old {
            self.scheduler.cancel(old.timer);
        }
    }

    /// A clone of the live value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        self.map
            .lock()
            .unwrap()
            .get(key)
            .map(|slot| slot.value.clone())
    }

    /// Removes and returns the value for `key`, cancelling its expiry.
    pub fn remove(&self, key: &K) -> Option<V> {
        let slot = self.map.lock().unwrap().remove(key)?;
        self.scheduler.cancel(slot.timer);
        Some(slot.value)
    }

    /// The number of live entries.
    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.map.lock().unwrap().len())
            .finish()
    }
}
