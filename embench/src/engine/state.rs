use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Run lifecycle.
///
/// The only transitions are `Running -> Draining` (on stop request) and
/// `* -> Stopped` (when the engine returns).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Attempts are being issued.
    Running = 0,
    /// No new attempts are issued, in-flight ones are finishing.
    Draining = 1,
    /// The run has returned.
    Stopped = 2,
}

impl From<u8> for Phase {
    #[inline]
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RunState {
    phase: AtomicU8,
    token: CancellationToken,
}

impl RunState {
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase.load(Ordering::SeqCst).into()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Requests the run to stop.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn stop(&self) -> bool {
        let rc = self
            .phase
            .compare_exchange(
                Phase::Running as u8,
                Phase::Draining as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();

        if rc {
            self.token.cancel();
        }

        rc
    }

    #[inline]
    pub fn finish(&self) {
        self.phase.store(Phase::Stopped as u8, Ordering::SeqCst);
    }

    /// Completes once the run has been asked to stop.
    #[inline]
    pub async fn draining(&self) {
        self.token.cancelled().await
    }
}

/// Cloneable handle to stop a running engine.
///
/// Safe to use from any thread or task, including signal handlers running
/// on a different task than the engine itself.
#[derive(Debug, Clone)]
pub struct Stop {
    state: Arc<RunState>,
}

impl Stop {
    pub(crate) fn new(state: Arc<RunState>) -> Self {
        Self { state }
    }

    /// Stops issuing new attempts.
    ///
    /// In-flight attempts are allowed to finish within the grace period.
    /// Calling this more than once has no additional effect.
    pub fn stop(&self) {
        if self.state.stop() {
            log::info!("stop requested, draining in-flight requests");
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }
}
