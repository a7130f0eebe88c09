//! Fixed-interval pacing between API calls.
//!
//! The collector asks a `Throttle` to pause at its courtesy points (after a batch
//! of accepted items, between sources). Production code blocks the thread; tests
//! record the requested pauses instead of sleeping.

use std::cell::RefCell;
use std::thread::sleep;
use std::time::Duration;

/// Where in the run a pause is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PausePoint {
    /// After every `batch_size` accepted items within a listing.
    Batch,
    /// After a listing has been fully consumed.
    Source,
    /// Between posts while sampling comments.
    Comments,
}

pub trait Throttle {
    fn pause(&self, point: PausePoint, dur: Duration);
}

/// Blocking sleep. Zero-length pauses return immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct SleepThrottle;

impl Throttle for SleepThrottle {
    fn pause(&self, point: PausePoint, dur: Duration) {
        if dur.is_zero() {
            return;
        }
        tracing::debug!(?point, ms = dur.as_millis() as u64, "throttle pause");
        sleep(dur);
    }
}

/// Records pauses without sleeping.
#[derive(Debug, Default)]
pub struct RecordingThrottle {
    pauses: RefCell<Vec<(PausePoint, Duration)>>,
}

impl RecordingThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<(PausePoint, Duration)> {
        self.pauses.borrow().clone()
    }

    pub fn count(&self, point: PausePoint) -> usize {
        self.pauses.borrow().iter().filter(|(p, _)| *p == point).count()
    }

    pub fn total(&self) -> Duration {
        self.pauses.borrow().iter().map(|(_, d)| *d).sum()
    }
}

impl Throttle for RecordingThrottle {
    fn pause(&self, point: PausePoint, dur: Duration) {
        self.pauses.borrow_mut().push((point, dur));
    }
}
