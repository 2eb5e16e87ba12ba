//! Latest-value subscriptions
//!
//! A [`Subscription`] is fed by one background worker through a single slot.
//! Publishing overwrites the slot and never waits for the subscriber, so a
//! slow subscriber skips intermediate states but always sees the latest one.
//!
//! ```text
//!   worker ──publish()──▶ [ slot: value, version ] ──next()──▶ subscriber
//!      ▲                                                          │
//!      └──────────────────── stop channel ◀──── cancel() ─────────┘
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

struct Slot<T> {
    value: Option<T>,
    /// Bumped on every publish
    version: u64,
    /// No further values will arrive
    closed: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    changed: Condvar,
}

/// Producer half, owned by the worker
pub(crate) struct Publisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Publisher<T> {
    /// Replace the current value and wake the subscriber
    pub(crate) fn publish(&self, value: T) {
        let mut slot = self.shared.slot.lock();
        slot.value = Some(value);
        slot.version += 1;
        self.shared.changed.notify_all();
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        self.shared.slot.lock().closed = true;
        self.shared.changed.notify_all();
    }
}

/// A stream of state snapshots delivered at-least-the-latest
pub struct Subscription<T> {
    shared: Arc<Shared<T>>,

    /// Version of the last value handed out
    seen: u64,

    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Start `work` on its own thread
    ///
    /// The worker receives the publisher and a stop receiver that fires (or
    /// disconnects) when the subscription is cancelled. It must return
    /// promptly once stopped.
    pub(crate) fn spawn<F>(name: &str, stop_tx: Sender<()>, stop_rx: Receiver<()>, work: F) -> Self
    where
        F: FnOnce(Publisher<T>, Receiver<()>) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                value: None,
                version: 0,
                closed: false,
            }),
            changed: Condvar::new(),
        });

        let publisher = Publisher {
            shared: Arc::clone(&shared),
        };
        let worker = match thread::Builder::new()
            .name(name.to_string())
            .spawn(move || work(publisher, stop_rx))
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                // The closure (and its publisher) was dropped, closing the slot
                tracing::error!(error = %e, "failed to spawn subscription worker");
                None
            }
        };

        Self {
            shared,
            seen: 0,
            stop: Some(stop_tx),
            worker,
        }
    }

    /// Wait for a value newer than the last one returned
    ///
    /// Returns `None` once the subscription is cancelled or its worker has
    /// stopped and nothing newer is pending.
    pub fn next(&mut self) -> Option<T> {
        self.wait(None)
    }

    /// Like [`Subscription::next`] but gives up after `timeout`
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<T> {
        self.wait(Some(Instant::now() + timeout))
    }

    /// Return a newer value if one is already available
    pub fn try_next(&mut self) -> Option<T> {
        let slot = self.shared.slot.lock();
        take_newer(&mut self.seen, &*slot)
    }

    /// Stop the worker and wait for it to finish
    ///
    /// Idempotent. Later calls to `next` return `None`.
    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("subscription worker panicked");
            }
        }
        self.shared.slot.lock().closed = true;
        self.seen = u64::MAX;
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.is_none()
    }

    fn wait(&mut self, deadline: Option<Instant>) -> Option<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = take_newer(&mut self.seen, &*slot) {
                return Some(value);
            }
            if slot.closed {
                return None;
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.changed.wait_until(&mut slot, deadline).timed_out() {
                        return take_newer(&mut self.seen, &*slot);
                    }
                }
                None => self.shared.changed.wait(&mut slot),
            }
        }
    }
}

fn take_newer<T: Clone>(seen: &mut u64, slot: &Slot<T>) -> Option<T> {
    if slot.version > *seen {
        *seen = slot.version;
        slot.value.clone()
    } else {
        None
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// A stop channel for one worker
///
/// Capacity 1 so any number of stop requests never block.
pub(crate) fn stop_channel() -> (Sender<()>, Receiver<()>) {
    channel::bounded(1)
}

/// Why a background loop woke up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    Stop,
    Event,
    /// The event stream disconnected
    Closed,
    Tick,
}

/// Block until stopped, an event arrives, or `interval` passes
///
/// Pending events are drained so one wake covers a burst of changes.
pub(crate) fn wait_for_change<E>(stop: &Receiver<()>, events: &Receiver<E>, interval: Duration) -> Wake {
    let wake = crossbeam::select! {
        recv(stop) -> _ => Wake::Stop,
        recv(events) -> msg => if msg.is_ok() { Wake::Event } else { Wake::Closed },
        default(interval) => Wake::Tick,
    };
    if wake == Wake::Event {
        while events.try_recv().is_ok() {}
    }
    wake
}
