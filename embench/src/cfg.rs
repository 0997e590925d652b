use core::{num::NonZero, str::FromStr, time::Duration};
use std::path::PathBuf;

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{
    cmd::Cmd,
    corpus::CorpusSource,
    engine::{self, http::payload::Mode, Target},
    error::ConfigurationError,
    report::Workload,
};

/// Validated settings of a single run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Embeddings endpoint.
    pub target: Target,
    /// Model name to put into requests.
    pub model: String,
    pub mode: Mode,
    /// Number of text fragments per request.
    pub batch_size: NonZero<usize>,
    /// Number of concurrent connections.
    pub concurrency: NonZero<usize>,
    /// Total number of requests.
    pub num_requests: NonZero<u64>,
    /// Fixed extra request headers.
    pub headers: HeaderMap,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Time given to in-flight requests after interruption.
    pub grace: Duration,
    pub corpus: CorpusSource,
    /// CSV results path.
    pub output: PathBuf,
    /// Number of runtime threads.
    pub threads: NonZero<usize>,
    pub progress_interval: Duration,
}

impl Config {
    /// Returns the HTTP engine part of this config.
    pub fn engine(&self) -> engine::Config {
        engine::Config {
            target: self.target.clone(),
            headers: self.headers.clone(),
            concurrency: self.concurrency,
            num_requests: self.num_requests,
            timeout: self.timeout,
            grace: self.grace,
        }
    }

    /// Returns the workload description for reporting.
    #[inline]
    pub fn workload(&self) -> Workload<'_> {
        Workload {
            model: &self.model,
            mode: self.mode,
            batch_size: self.batch_size,
            concurrency: self.concurrency,
        }
    }
}

impl TryFrom<Cmd> for Config {
    type Error = ConfigurationError;

    fn try_from(cmd: Cmd) -> Result<Self, Self::Error> {
        let Cmd {
            concurrency,
            batch_size,
            mode,
            url,
            model,
            num_requests,
            corpus,
            headers,
            timeout,
            grace,
            output,
            threads,
            progress_interval,
            verbose: _,
        } = cmd;

        let concurrency = NonZero::new(concurrency).ok_or(ConfigurationError::Zero("concurrency"))?;
        let batch_size = NonZero::new(batch_size).ok_or(ConfigurationError::Zero("batch size"))?;
        let num_requests = NonZero::new(num_requests).ok_or(ConfigurationError::Zero("number of requests"))?;

        let url = url.filter(|v| !v.is_empty()).ok_or(ConfigurationError::MissingUrl)?;
        let model = model.filter(|v| !v.is_empty()).ok_or(ConfigurationError::MissingModel)?;
        let target = Target::embeddings(&url)?;
        let headers = parse_headers(&headers)?;

        let threads = match threads {
            Some(v) => NonZero::new(v).ok_or(ConfigurationError::Zero("number of threads"))?,
            None => std::thread::available_parallelism().unwrap_or(NonZero::<usize>::MIN),
        };

        let m = Self {
            target,
            model,
            mode,
            batch_size,
            concurrency,
            num_requests,
            headers,
            timeout: secs("timeout", timeout)?,
            grace: Duration::try_from_secs_f64(grace).map_err(|_| ConfigurationError::Duration("grace period"))?,
            corpus,
            output,
            threads,
            progress_interval: Duration::from_millis(progress_interval.max(1)),
        };

        Ok(m)
    }
}

/// Parses a strictly positive number of seconds.
fn secs(name: &'static str, v: f64) -> Result<Duration, ConfigurationError> {
    match Duration::try_from_secs_f64(v) {
        Ok(v) if !v.is_zero() => Ok(v),
        _ => Err(ConfigurationError::Duration(name)),
    }
}

/// Parses headers given in "Name: value" form.
pub fn parse_headers<S>(headers: &[S]) -> Result<HeaderMap, ConfigurationError>
where
    S: AsRef<str>,
{
    let mut out = HeaderMap::new();

    for header in headers {
        let header = header.as_ref();
        let invalid = || ConfigurationError::InvalidHeader(header.to_string());

        let (name, value) = header.split_once(':').ok_or_else(invalid)?;
        let name = HeaderName::from_str(name.trim()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;

        out.append(name, value);
    }

    Ok(out)
}
