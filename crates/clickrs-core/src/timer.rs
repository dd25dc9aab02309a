// Clickrs Timer Subsystem
// Single-shot hold/level timers delivered back into the classifier

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::button::{ButtonNumber, DeviceId};

/// Which of a record's two independent timers expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TimerKind {
    /// Press held long enough to act as a modifier, independent of release.
    #[strum(serialize = "hold")]
    Hold,
    /// Click-cycle window elapsed; a further press starts a new cycle.
    #[strum(serialize = "level")]
    Level,
}

/// Errors that can occur when scheduling timers
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("timer worker is not running")]
    Stopped,

    #[error("failed to spawn timer worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to one scheduled single-shot timer.
///
/// Cancellation is non-blocking and flag-based: a cancelled entry stays in the
/// worker's heap until its deadline and is skipped on pop. The `id` lets the
/// classifier detect stale expiries that were popped just before cancellation.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Expiry notification delivered to the subsystem's handler.
#[derive(Debug, Clone, Copy)]
pub struct TimerExpiry {
    pub device: DeviceId,
    pub button: ButtonNumber,
    pub kind: TimerKind,
    /// Id of the handle this expiry belongs to, for staleness checks.
    pub id: u64,
}

type TimerCallback = Box<dyn Fn(TimerExpiry) + Send + Sync>;

struct Entry {
    deadline: Instant,
    expiry: TimerExpiry,
    cancelled: Arc<AtomicBool>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.expiry.id == other.expiry.id
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.expiry.id.cmp(&other.expiry.id))
    }
}

struct TimerShared {
    heap: Mutex<BinaryHeap<Reverse<Entry>>>,
    wakeup: Condvar,
    next_id: AtomicU64,
    running: AtomicBool,
    handler: OnceLock<TimerCallback>,
}

/// Scheduler for the per-record hold and level timers.
///
/// A single background worker owns a deadline heap and delivers expiries to
/// the registered handler one at a time, with no internal locks held. The
/// handler re-enters the classifier through the same per-device mutex as
/// hardware edges, which is what serializes timer callbacks against the edge
/// feed.
pub struct TimerSubsystem {
    shared: Arc<TimerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TimerSubsystem {
    /// Spawn the worker thread. The handler must be registered with
    /// [`set_handler`](Self::set_handler) before any timer can fire usefully.
    pub fn spawn() -> Result<Self, TimerError> {
        let shared = Arc::new(TimerShared {
            heap: Mutex::new(BinaryHeap::new()),
            wakeup: Condvar::new(),
            next_id: AtomicU64::new(1),
            running: AtomicBool::new(true),
            handler: OnceLock::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("clickrs-timers".to_string())
            .spawn(move || run_worker(&worker_shared))?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Register the expiry handler. Only the first registration takes effect.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(TimerExpiry) + Send + Sync + 'static,
    {
        let _ = self.shared.handler.set(Box::new(handler));
    }

    /// Schedule a single-shot timer. The caller owns the returned handle;
    /// storing it in the record's single slot per kind (and cancelling the
    /// slot's previous occupant) is what keeps at most one live timer of each
    /// kind per record.
    pub fn schedule(
        &self,
        device: DeviceId,
        button: ButtonNumber,
        kind: TimerKind,
        delay: Duration,
    ) -> Result<TimerHandle, TimerError> {
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(TimerError::Stopped);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = TimerHandle {
            id,
            cancelled: Arc::clone(&cancelled),
        };
        let entry = Entry {
            deadline: Instant::now() + delay,
            expiry: TimerExpiry {
                device,
                button,
                kind,
                id,
            },
            cancelled,
        };

        self.shared.heap.lock().push(Reverse(entry));
        self.shared.wakeup.notify_one();
        log::debug!("scheduled {kind} timer {id} for device {device} button {button}");
        Ok(handle)
    }

    /// Cancel a scheduled timer. No-op if it already fired.
    pub fn cancel(&self, handle: &TimerHandle) {
        handle.cancel();
    }

    /// Stop the worker. Pending timers are dropped without firing; further
    /// `schedule` calls fail with [`TimerError::Stopped`].
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.wakeup.notify_all();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            // The handler may hold the last reference to our owner, in which
            // case this drop runs on the worker itself; it must not join its
            // own thread. The worker exits on the cleared running flag.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for TimerSubsystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &TimerShared) {
    let mut due: Vec<TimerExpiry> = Vec::new();
    loop {
        {
            let mut heap = shared.heap.lock();
            if !shared.running.load(Ordering::Acquire) {
                return;
            }

            let now = Instant::now();
            while let Some(Reverse(head)) = heap.peek() {
                if head.deadline > now {
                    break;
                }
                let Some(Reverse(entry)) = heap.pop() else {
                    break;
                };
                if !entry.cancelled.load(Ordering::Acquire) {
                    due.push(entry.expiry);
                }
            }

            if due.is_empty() {
                let next_deadline = heap.peek().map(|Reverse(head)| head.deadline);
                match next_deadline {
                    Some(deadline) => {
                        let _ = shared.wakeup.wait_until(&mut heap, deadline);
                    }
                    None => shared.wakeup.wait(&mut heap),
                }
                continue;
            }
        }

        // Deliver outside the heap lock so handlers may schedule or cancel.
        for expiry in due.drain(..) {
            if let Some(handler) = shared.handler.get() {
                handler(expiry);
            }
        }
    }
}
