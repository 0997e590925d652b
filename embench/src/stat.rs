use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use http::StatusCode;

use crate::{
    error::AttemptError,
    recorder::{LatencyRecorder, Percentiles},
};

/// Complete response of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    /// Time from just before the request was sent up to receiving the last
    /// body frame.
    pub latency: Duration,
}

/// Result of a single attempt.
pub type Outcome = Result<Response, AttemptError>;

/// Run-wide counters, shared by all slots.
#[derive(Debug, Default)]
pub struct Stat {
    /// The number of attempts issued, i.e. tickets handed out.
    num_issued: AtomicU64,
    /// The number of complete responses, regardless of status.
    num_responses: AtomicU64,
    /// The number of sockets connected and handshaked.
    num_sock_created: AtomicU64,
    /// The number of errors occurred during connection establishing or
    /// communication.
    num_sock_errors: AtomicU64,
    num_timeouts: AtomicU64,
    /// The number of attempts that reached an outcome.
    num_completed: AtomicU64,
    /// The number of attempts that did not end up with a 2xx response.
    ///
    /// Always incremented after the completed counter, so that a reader
    /// never observes more failures than completions.
    num_failed: AtomicU64,
    num_2xx: AtomicU64,
    num_3xx: AtomicU64,
    num_4xx: AtomicU64,
    num_5xx: AtomicU64,
    num_xxx: AtomicU64,
    latency: LatencyRecorder,
}

impl Stat {
    /// Claims the right to issue one more attempt.
    ///
    /// Returns `false` once `limit` attempts have been issued. Exactly `limit`
    /// calls return `true` over the lifetime of this object.
    #[inline]
    pub fn try_issue(&self, limit: u64) -> bool {
        self.num_issued
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| (v < limit).then_some(v + 1))
            .is_ok()
    }

    /// Claims an attempt as long as `is_running` holds both before and after
    /// the claim.
    ///
    /// A claim that raced with a stop request is given back, so no attempt
    /// starts after the run has been observed stopping.
    pub fn try_issue_while<F>(&self, limit: u64, is_running: F) -> bool
    where
        F: Fn() -> bool,
    {
        if !is_running() || !self.try_issue(limit) {
            return false;
        }
        if is_running() {
            return true;
        }

        self.num_issued.fetch_sub(1, Ordering::Relaxed);
        false
    }

    #[inline]
    pub fn on_sock_created(&self) {
        self.num_sock_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Folds the given attempt outcome into the counters.
    pub fn on_outcome(&self, outcome: Outcome) {
        match outcome {
            Ok(resp) => {
                self.on_response(resp);
                self.num_completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                log::debug!("attempt failed: {err}");

                match err {
                    AttemptError::Http { status, latency } => self.on_response(Response { status, latency }),
                    AttemptError::Timeout(..) => {
                        self.num_timeouts.fetch_add(1, Ordering::Relaxed);
                    }
                    AttemptError::Transport(..) => {
                        self.num_sock_errors.fetch_add(1, Ordering::Relaxed);
                    }
                }
                self.num_completed.fetch_add(1, Ordering::Relaxed);
                self.num_failed.fetch_add(1, Ordering::Release);
            }
        }
    }

    #[inline]
    fn on_response(&self, resp: Response) {
        self.latency.record(resp.latency.as_secs_f64() * 1000.0);

        let counter = match resp.status.as_u16() {
            200..300 => &self.num_2xx,
            300..400 => &self.num_3xx,
            400..500 => &self.num_4xx,
            500..600 => &self.num_5xx,
            _ => &self.num_xxx,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.num_responses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn num_issued(&self) -> u64 {
        self.num_issued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn num_sock_created(&self) -> u64 {
        self.num_sock_created.load(Ordering::Relaxed)
    }

    /// Returns the latency summary over all complete responses.
    #[inline]
    pub fn percentiles(&self) -> Percentiles {
        self.latency.finalize()
    }

    /// Returns a copy of the counters.
    pub fn snapshot(&self) -> Snapshot {
        // Failures first: the acquire pairs with the release increment, making
        // every completion behind an observed failure visible.
        let num_failed = self.num_failed.load(Ordering::Acquire);
        let num_completed = self.num_completed.load(Ordering::Relaxed);
        let num_responses = self.num_responses.load(Ordering::Relaxed);
        let num_2xx = self.num_2xx.load(Ordering::Relaxed);
        let num_sock_errors = self.num_sock_errors.load(Ordering::Relaxed);
        let num_timeouts = self.num_timeouts.load(Ordering::Relaxed);
        let num_issued = self.num_issued.load(Ordering::Relaxed);

        Snapshot {
            num_issued,
            num_completed,
            num_failed,
            num_responses,
            num_sock_errors,
            num_timeouts,
            num_2xx,
            num_3xx: self.num_3xx.load(Ordering::Relaxed),
            num_4xx: self.num_4xx.load(Ordering::Relaxed),
            num_5xx: self.num_5xx.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Stat`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub num_issued: u64,
    /// Attempts that reached an outcome: a response, a transport error or a
    /// timeout.
    pub num_completed: u64,
    /// Attempts that did not end up with a 2xx response, never more than
    /// `num_completed`.
    pub num_failed: u64,
    pub num_responses: u64,
    pub num_sock_errors: u64,
    pub num_timeouts: u64,
    pub num_2xx: u64,
    pub num_3xx: u64,
    pub num_4xx: u64,
    pub num_5xx: u64,
}
