use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Per-display-frame callback of the host
#[allow(async_fn_in_trait)]
pub trait FrameClock {
    /// Wait for the next rendering tick
    async fn next_frame(&mut self);
}

/// Frame clock driven by a tokio interval
///
/// Late ticks are delayed rather than bursted, so a slow iteration never
/// causes back-to-back iterations.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Interval,
}

impl IntervalClock {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl FrameClock for IntervalClock {
    async fn next_frame(&mut self) {
        self.interval.tick().await;
    }
}

/// Clock that never waits, for offline processing
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateClock;

impl FrameClock for ImmediateClock {
    async fn next_frame(&mut self) {
        tokio::task::yield_now().await;
    }
}
