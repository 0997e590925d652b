use core::{num::NonZero, time::Duration};

use http::HeaderMap;

use super::Target;

/// HTTP engine config.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target endpoint.
    pub target: Target,
    /// Fixed headers sent with every request, in addition to "Host" and
    /// "Content-Type".
    pub headers: HeaderMap,
    /// Number of parallel slots, each owning a single connection.
    ///
    /// This is exactly the maximum number of requests in flight.
    pub concurrency: NonZero<usize>,
    /// Total number of attempts to issue.
    pub num_requests: NonZero<u64>,
    /// Per-attempt deadline, including reconnection if any.
    pub timeout: Duration,
    /// How long in-flight attempts may continue after a stop request.
    pub grace: Duration,
}
