//! Periodic run progress.
//!
//! Progress is sampled from the shared counters at a coarse interval, so the
//! engine hot path is never touched.

use core::{
    fmt::{self, Display, Formatter},
    time::Duration,
};
use std::{sync::Arc, time::Instant};

use tokio::time::MissedTickBehavior;

use crate::stat::{Snapshot, Stat};

/// Shortest window the completion rate is measured over.
const MIN_RATE_WINDOW: Duration = Duration::from_millis(50);

/// Progress line: issued, completed and failed attempts plus current rate.
pub struct Progress {
    stat: Arc<Stat>,
    total: u64,
    curr: Snapshot,
    /// Completions per second over the last window.
    rate: f64,
    prev_completed: u64,
    prev_ts: Instant,
}

impl Progress {
    pub fn new(stat: Arc<Stat>, total: u64) -> Self {
        Self {
            stat,
            total,
            curr: Snapshot::default(),
            rate: 0.0,
            prev_completed: 0,
            prev_ts: Instant::now(),
        }
    }

    /// Takes a fresh snapshot and updates the rate, unless the previous
    /// update was too recent.
    pub fn update(&mut self) {
        self.curr = self.stat.snapshot();

        let now = Instant::now();
        let dt = now.duration_since(self.prev_ts);
        if dt < MIN_RATE_WINDOW {
            return;
        }

        let dv = self.curr.num_completed.saturating_sub(self.prev_completed);
        self.rate = dv as f64 / dt.as_secs_f64();
        self.prev_completed = self.curr.num_completed;
        self.prev_ts = now;
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Logs progress every `interval` until the returned future is dropped.
    pub async fn run(mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.update();
            log::info!("{self}");
        }
    }
}

impl Display for Progress {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "issued {}/{}, completed {}, failed {}, {:.1} req/s",
            self.curr.num_issued, self.total, self.curr.num_completed, self.curr.num_failed, self.rate
        )
    }
}
