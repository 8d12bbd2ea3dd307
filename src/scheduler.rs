use async_trait::async_trait;
use std::time::Duration;
use tokio::{
    sync::Mutex,
    time::{interval, Interval, MissedTickBehavior},
};

/// The host's "run again before the next paint" primitive.
#[async_trait]
pub trait FrameScheduler: Send + Sync {
    /// Resolve when the next frame should be processed.
    async fn next_frame(&self);
}

/// Paces frames at a fixed rate, skipping frames the loop was too slow for.
pub struct IntervalScheduler {
    interval: Mutex<Interval>,
}

impl IntervalScheduler {
    /// Must be called from within a Tokio runtime.
    pub fn new(frame_rate: u32) -> Self {
        let period = Duration::from_secs(1) / frame_rate.max(1);
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval: Mutex::new(interval),
        }
    }
}

#[async_trait]
impl FrameScheduler for IntervalScheduler {
    async fn next_frame(&self) {
        self.interval.lock().await.tick().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{FrameScheduler, IntervalScheduler};
    use async_trait::async_trait;
    use std::time::{Duration, Instant};
    use tokio::sync::{mpsc, Mutex};

    /// Frames are released one at a time by the test.
    pub(crate) struct ManualScheduler {
        ticks: Mutex<mpsc::UnboundedReceiver<()>>,
    }

    impl ManualScheduler {
        pub(crate) fn new() -> (Self, mpsc::UnboundedSender<()>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Self {
                    ticks: Mutex::new(rx),
                },
                tx,
            )
        }
    }

    #[async_trait]
    impl FrameScheduler for ManualScheduler {
        async fn next_frame(&self) {
            if self.ticks.lock().await.recv().await.is_none() {
                futures::future::pending::<()>().await;
            }
        }
    }

    #[tokio::test]
    async fn interval_scheduler_paces_frames() {
        let scheduler = IntervalScheduler::new(100);
        let start = Instant::now();
        for _ in 0..4 {
            scheduler.next_frame().await;
        }
        // the first tick is immediate
        assert!(start.elapsed() >= Duration::from_millis(25));
    }
}
