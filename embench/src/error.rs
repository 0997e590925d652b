use core::time::Duration;
use std::{io, path::PathBuf};

use http::StatusCode;
use thiserror::Error;

/// Invalid or missing run settings.
///
/// Always fatal: the run never starts.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("{0} must be a positive number of seconds")]
    Duration(&'static str),
    #[error("URL must be provided via --url flag or URL_ENDPOINT environment variable")]
    MissingUrl,
    #[error("model must be provided via --model flag or MODEL_NAME environment variable")]
    MissingModel,
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme '{0}', only plain http is supported")]
    UnsupportedScheme(String),
    #[error("invalid header '{0}', expected 'Name: value'")]
    InvalidHeader(String),
}

/// Failure to obtain the text corpus.
///
/// Surfaced before the engine starts, so there is never a partial run.
#[derive(Debug, Error)]
pub enum CorpusFetchError {
    #[error("failed to read corpus from '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to fetch corpus: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to fetch corpus: {0}")]
    Status(StatusCode),
    #[error("failed to fetch corpus: no complete response within {0:?}")]
    Timeout(Duration),
    #[error("invalid corpus URL: {0}")]
    InvalidUrl(String),
    #[error("failed to load tokenizer: {0:#}")]
    Tokenizer(anyhow::Error),
    #[error("corpus contains no text")]
    Empty,
}

/// Per-attempt failure.
///
/// These never escape the engine, they are folded into the run counters.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Connection-level failure: refused, reset, DNS and so on.
    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),
    /// The attempt exceeded its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Complete response with a non-2xx status.
    #[error("unexpected status: {status}")]
    Http { status: StatusCode, latency: Duration },
}

impl AttemptError {
    /// Returns the measured latency, if this failure still counts as a valid
    /// latency sample.
    ///
    /// Only complete responses are measured, transport failures and timeouts
    /// are not.
    #[inline]
    pub fn latency(&self) -> Option<Duration> {
        match self {
            Self::Http { latency, .. } => Some(*latency),
            Self::Transport(..) | Self::Timeout(..) => None,
        }
    }
}
