use core::{future::Future, num::NonZero, time::Duration};

use tokio::task::JoinSet;

use super::state::RunState;

/// Fixed-size pool of concurrent slots.
///
/// Each slot is a task produced by the factory, spawned on the current
/// runtime and polled until it completes on its own or the run is stopped.
#[derive(Debug)]
pub struct SlotPool<F> {
    num_slots: NonZero<usize>,
    factory: F,
}

impl<F> SlotPool<F> {
    pub fn new(num_slots: NonZero<usize>, factory: F) -> Self {
        Self { num_slots, factory }
    }
}

impl<F, T> SlotPool<F>
where
    F: FnMut(usize) -> T,
    T: Future<Output = ()> + Send + 'static,
{
    /// Spawns all slots and waits for them to complete.
    ///
    /// Once the run is asked to stop, slots have `grace` time to finish their
    /// in-flight work, after that they are aborted.
    pub async fn run(mut self, state: &RunState, grace: Duration) {
        let num_slots = self.num_slots.get();
        let mut jobs = JoinSet::new();

        for idx in 0..num_slots {
            jobs.spawn((self.factory)(idx));
        }

        let stopped = tokio::select! {
            () = join_all(&mut jobs) => false,
            () = state.draining() => true,
        };

        if stopped && tokio::time::timeout(grace, join_all(&mut jobs)).await.is_err() {
            log::warn!(
                "{} slots did not finish within {:?} grace period, aborting",
                jobs.len(),
                grace
            );
            jobs.abort_all();
            join_all(&mut jobs).await;
        }
    }
}

async fn join_all(jobs: &mut JoinSet<()>) {
    while let Some(rc) = jobs.join_next().await {
        if let Err(err) = rc {
            if err.is_panic() {
                log::error!("slot panicked: {err}");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::{sync::Arc, time::Instant};

    use super::*;

    #[tokio::test]
    async fn test_runs_every_slot() {
        let state = RunState::default();
        let counter = Arc::new(AtomicUsize::new(0));

        let pool = SlotPool::new(NonZero::new(4).unwrap(), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        pool.run(&state, Duration::from_secs(1)).await;

        assert_eq!(4, counter.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_aborts_after_grace() {
        let state = Arc::new(RunState::default());
        state.stop();

        let now = Instant::now();
        let pool = SlotPool::new(NonZero::new(2).unwrap(), |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        pool.run(&state, Duration::from_millis(50)).await;

        assert!(now.elapsed() < Duration::from_secs(10));
    }
}
