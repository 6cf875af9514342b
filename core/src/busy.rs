//! Network-activity ("busy") signal shared by all in-flight calls.
//!
//! # Design
//! One counter per [`ActivityTracker`], guarded by a mutex. The surface is
//! notified while the lock is held, so `true`/`false` transitions reach it in
//! the same order the counter moved and can never interleave out of order.
//! Surfaces must not block: they hand the value off to whatever context owns
//! UI state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Receiver of busy transitions. Called from arbitrary worker threads.
pub trait BusySurface: Send + Sync {
    fn set_busy(&self, busy: bool);
}

/// Discards all transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSurface;

impl BusySurface for NoopSurface {
    fn set_busy(&self, _busy: bool) {}
}

/// Publishes transitions into a `watch` channel.
///
/// The UI side holds the receiver and awaits `changed()` on its own executor,
/// so `set_busy` never waits on the UI.
#[derive(Debug)]
pub struct WatchSurface {
    tx: watch::Sender<bool>,
}

impl WatchSurface {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }
}

impl BusySurface for WatchSurface {
    fn set_busy(&self, busy: bool) {
        self.tx.send_replace(busy);
    }
}

/// Reentrant in-flight counter driving a [`BusySurface`].
pub struct ActivityTracker {
    in_flight: Mutex<usize>,
    surface: Arc<dyn BusySurface>,
}

impl ActivityTracker {
    pub fn new(surface: Arc<dyn BusySurface>) -> Self {
        Self {
            in_flight: Mutex::new(0),
            surface,
        }
    }

    /// Count one more call in flight. The returned guard counts it out again
    /// when dropped, on every exit path.
    #[must_use = "dropping the guard immediately ends the busy period"]
    pub fn enter(&self) -> BusyGuard<'_> {
        let mut in_flight = self.in_flight.lock();
        if *in_flight == 0 {
            tracing::trace!("busy");
            self.surface.set_busy(true);
        }
        *in_flight += 1;
        BusyGuard { tracker: self }
    }

    fn exit(&self) {
        let mut in_flight = self.in_flight.lock();
        // Clamped at zero: an unbalanced exit must not wrap.
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            tracing::trace!("idle");
            self.surface.set_busy(false);
        }
    }
}

impl std::fmt::Debug for ActivityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityTracker")
            .field("in_flight", &*self.in_flight.lock())
            .finish_non_exhaustive()
    }
}

/// Scoped membership in the in-flight count.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    tracker: &'a ActivityTracker,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.tracker.exit();
    }
}
