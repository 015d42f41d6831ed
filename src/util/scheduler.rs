//! A single-timer scheduler over a heap of deadlines.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

type Callback = Box<dyn FnOnce() + Send>;

/// Identifies a scheduled task so it can be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

struct Entry {
    at: Instant,
    id: u64,
    callback: Callback,
}

// Min-heap on deadline; ties run in schedule order.
impl Ord for Entry {
    fn cmp(&self, other: &Entry) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Entry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Entry) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl Eq for Entry {}

#[derive(Default)]
struct Inner {
    entries: BinaryHeap<Entry>,
    cancelled: HashSet<u64>,
    next_id: u64,
}

/// Runs callbacks at absolute deadlines using one armed timer.
///
/// A dedicated task sleeps until the earliest deadline, runs everything
/// that is due, and re-arms. Inserting an earlier deadline wakes the task
/// so the timer collapses to the new minimum.
pub struct Scheduler {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    driver: tokio::task::JoinHandle<()>,
}

impl Scheduler {
    /// Creates the scheduler and spawns its driver task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Scheduler {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let notify = Arc::new(Notify::new());
        let driver = tokio::spawn(drive(Arc::clone(&inner), Arc::clone(&notify)));
        Scheduler {
            inner,
            notify,
            driver,
        }
    }

    /// Schedules `callback` to run at `at`.
    pub fn schedule(&self, at: Instant, callback: impl FnOnce() + Send + 'static) -> TaskHandle {
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push(Entry {
                at,
                id,
                callback: Box::new(callback),
            });
            id
        };
        self.notify.notify_one();
        TaskHandle(id)
    }

    /// Cancels a scheduled task. Returns false if it already ran or was
    /// already cancelled.
    pub fn cancel(&self, handle: TaskHandle) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.cancelled.contains(&handle.0) {
            return false;
        }
        if inner.entries.iter().any(|e| e.id == handle.0) {
            inner.cancelled.insert(handle.0);
            true
        } else {
            false
        }
    }

    /// The number of live (not yet run, not cancelled) tasks.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.entries.len() - inner.cancelled.len()
    }

    /// Whether no tasks are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn drive(inner: Arc<Mutex<Inner>>, notify: Arc<Notify>) {
    loop {
        let mut due: Vec<Callback> = Vec::new();
        let next = {
            let mut inner = inner.lock().unwrap();
            let now = Instant::now();
            while let Some(entry) = inner.entries.peek() {
                if entry.at > now {
                    break;
                }
                let entry = inner.entries.pop().expect("peeked entry");
                if !inner.cancelled.remove(&entry.id) {
                    due.push(entry.callback);
                }
            }
            inner.entries.peek().map(|e| e.at)
        };
        for callback in due {
            callback();
        }
        match next {
            Some(at) => {
                tokio::select! {
                    _ = sleep_until(at) => {}
                    _ = notify.notified() => {}
                }
            }
            None => notify.notified().await,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Scheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn runs_due_tasks_in_deadline_order() {
        let scheduler = Scheduler::new();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        for (label, ms) in &[("b", 20u64), ("a", 10), ("c", 30)] {
            let log = Arc::clone(&log);
            let label = *label;
            scheduler.schedule(Instant::now() + Duration::from_millis(*ms), move || {
                log.lock().unwrap().push(label);
            });
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_insertion_rearms_the_timer() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let far = Arc::clone(&counter);
        scheduler.schedule(Instant::now() + Duration::from_secs(60), move || {
            far.fetch_add(100, Ordering::SeqCst);
        });
        let near = Arc::clone(&counter);
        scheduler.schedule(Instant::now() + Duration::from_millis(5), move || {
            near.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_tasks_do_not_run() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let hit = Arc::clone(&counter);
        let handle = scheduler.schedule(Instant::now() + Duration::from_millis(5), move || {
            hit.fetch_add(1, Ordering::SeqCst);
        });
        assert!(scheduler.cancel(handle));
        // A second cancel of the same still-pending handle is a no-op.
        assert!(!scheduler.cancel(handle));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!scheduler.cancel(handle));
    }
}
