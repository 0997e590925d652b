use core::{
    fmt::{self, Display, Formatter},
    num::NonZero,
    time::Duration,
};
use std::borrow::Cow;

use serde::Serialize;

use crate::{engine::http::payload::Mode, recorder::Percentiles, stat::Snapshot};

/// Final run summary.
///
/// Latencies are in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    /// Attempts that reached an outcome.
    pub total_requests: u64,
    /// Attempts ended with non-2xx status, transport error or timeout.
    pub failed_requests: u64,
    pub min_latency: f64,
    pub median_latency: f64,
    pub p90_latency: f64,
    pub p99_latency: f64,
    pub max_latency: f64,
    /// Total requests divided by the wall-clock duration of the run.
    pub requests_per_second: f64,
}

impl BenchmarkResult {
    pub fn new(snapshot: &Snapshot, latency: Percentiles, elapsed: Duration) -> Self {
        let total_requests = snapshot.num_completed;
        let secs = elapsed.as_secs_f64();
        let requests_per_second = if secs > 0.0 {
            total_requests as f64 / secs
        } else {
            0.0
        };

        Self {
            total_requests,
            failed_requests: snapshot.num_failed,
            min_latency: latency.min,
            median_latency: latency.median,
            p90_latency: latency.p90,
            p99_latency: latency.p99,
            max_latency: latency.max,
            requests_per_second,
        }
    }

    /// Returns the percentage of failed requests, zero if nothing completed.
    #[inline]
    pub fn fail_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }

        self.failed_requests as f64 / self.total_requests as f64 * 100.0
    }

    /// Renders the human-readable report.
    #[inline]
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Renders a single CSV row, without header and line terminator.
    ///
    /// Columns: model, tokens, batch size, concurrency, min, median, p90, p99,
    /// max, throughput.
    pub fn to_csv_row(&self, workload: &Workload) -> String {
        format!(
            "{},{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
            csv_escape(workload.model),
            workload.num_tokens(),
            workload.batch_size,
            workload.concurrency,
            self.min_latency,
            self.median_latency,
            self.p90_latency,
            self.p99_latency,
            self.max_latency,
            self.requests_per_second,
        )
    }
}

impl Display for BenchmarkResult {
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "Benchmark Results:")?;
        writeln!(f, "-----------------")?;
        writeln!(f, "Total Requests: {}", self.total_requests)?;
        writeln!(f, "Failed Requests: {}", self.failed_requests)?;
        writeln!(f, "Fail Rate: {:.2}%", self.fail_rate())?;
        writeln!(f)?;
        writeln!(f, "Latency:")?;
        writeln!(f, "  Min: {:.2} ms", self.min_latency)?;
        writeln!(f, "  Median: {:.2} ms", self.median_latency)?;
        writeln!(f, "  P90: {:.2} ms", self.p90_latency)?;
        writeln!(f, "  P99: {:.2} ms", self.p99_latency)?;
        writeln!(f, "  Max: {:.2} ms", self.max_latency)?;
        writeln!(f)?;
        writeln!(f, "Throughput:")?;
        write!(f, "  Requests per second: {:.2}", self.requests_per_second)
    }
}

/// Quotes a CSV field if it contains a separator, a quote or a line break.
fn csv_escape(v: &str) -> Cow<'_, str> {
    if v.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", v.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(v)
    }
}

/// Workload description attached to each CSV row.
#[derive(Debug, Clone, Copy)]
pub struct Workload<'a> {
    pub model: &'a str,
    pub mode: Mode,
    pub batch_size: NonZero<usize>,
    pub concurrency: NonZero<usize>,
}

impl Workload<'_> {
    /// Nominal number of tokens per request.
    #[inline]
    pub fn num_tokens(&self) -> usize {
        self.mode.tokens_per_fragment() * self.batch_size.get()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn workload(mode: Mode) -> Workload<'static> {
        Workload {
            model: "bge-m3",
            mode,
            batch_size: NonZero::new(8).unwrap(),
            concurrency: NonZero::new(4).unwrap(),
        }
    }

    #[test]
    fn test_zero_total_fail_rate() {
        let result = BenchmarkResult::default();

        assert_eq!(0.0, result.fail_rate());
        assert!(result.to_text().contains("Fail Rate: 0.00%"));
    }

    #[test]
    fn test_text_report() {
        let result = BenchmarkResult {
            total_requests: 8,
            failed_requests: 1,
            min_latency: 10.0,
            median_latency: 12.3456,
            p90_latency: 20.0,
            p99_latency: 30.0,
            max_latency: 31.5,
            requests_per_second: 99.999,
        };

        let text = result.to_text();

        assert!(text.contains("Total Requests: 8\n"));
        assert!(text.contains("Failed Requests: 1\n"));
        assert!(text.contains("Fail Rate: 12.50%\n"));
        assert!(text.contains("  Median: 12.35 ms\n"));
        assert!(text.contains("  Max: 31.50 ms\n"));
        assert!(text.ends_with("  Requests per second: 100.00"));
    }

    #[test]
    fn test_csv_row() {
        let result = BenchmarkResult {
            total_requests: 10,
            failed_requests: 0,
            min_latency: 50.0,
            median_latency: 51.0,
            p90_latency: 52.25,
            p99_latency: 53.0,
            max_latency: 54.0,
            requests_per_second: 40.0,
        };

        assert_eq!(
            "bge-m3,160,8,4,50.00,51.00,52.25,53.00,54.00,40.00",
            result.to_csv_row(&workload(Mode::Query))
        );
        assert!(result
            .to_csv_row(&workload(Mode::Passage))
            .starts_with("bge-m3,2400,8,4,"));
    }

    #[test]
    fn test_csv_row_quotes_model() {
        let result = BenchmarkResult::default();
        let mut workload = workload(Mode::Query);

        workload.model = "org/model,v2";
        assert!(result.to_csv_row(&workload).starts_with("\"org/model,v2\",160,"));

        workload.model = "the \"best\" model";
        assert!(result.to_csv_row(&workload).starts_with("\"the \"\"best\"\" model\",160,"));
    }

    #[test]
    fn test_new_from_snapshot() {
        let snapshot = Snapshot {
            num_issued: 10,
            num_completed: 10,
            num_failed: 4,
            num_responses: 8,
            num_sock_errors: 1,
            num_timeouts: 1,
            num_2xx: 6,
            num_5xx: 2,
            ..Default::default()
        };
        let latency = Percentiles {
            min: 1.0,
            median: 2.0,
            p90: 3.0,
            p99: 4.0,
            max: 5.0,
        };

        let result = BenchmarkResult::new(&snapshot, latency, Duration::from_millis(500));

        assert_eq!(10, result.total_requests);
        assert_eq!(4, result.failed_requests);
        assert_eq!(20.0, result.requests_per_second);
        assert_eq!(5.0, result.max_latency);
    }
}
