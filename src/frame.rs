//! Frame clocks: the "run before the next repaint" primitive.
//!
//! A render pass awaits [`FrameClock::next_frame`] before each batch, which is
//! its only suspension point.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;

/// One frame at 60 Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Source of paint opportunities.
pub trait FrameClock: Send + Sync {
    /// Resolve at the next paint opportunity.
    fn next_frame(&self) -> BoxFuture<'_, ()>;
}

/// Frame clock that waits a fixed interval between frames.
#[derive(Debug, Clone, Copy)]
pub struct IntervalFrameClock {
    interval: Duration,
}

impl IntervalFrameClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for IntervalFrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl FrameClock for IntervalFrameClock {
    fn next_frame(&self) -> BoxFuture<'_, ()> {
        tokio::time::sleep(self.interval).boxed()
    }
}

/// Frame clock that only yields back to the runtime.
///
/// Useful when there is no real paint loop and batches should simply let
/// other tasks run in between.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldFrameClock;

impl FrameClock for YieldFrameClock {
    fn next_frame(&self) -> BoxFuture<'_, ()> {
        tokio::task::yield_now().boxed()
    }
}
