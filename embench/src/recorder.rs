use std::sync::{Mutex, MutexGuard, PoisonError};

/// Percentiles in per-myriad units, so that ranks are computed with integer
/// arithmetic only.
const P50: u64 = 5000;
const P90: u64 = 9000;
const P99: u64 = 9900;
const P100: u64 = 10000;

/// Latency summary in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentiles {
    pub min: f64,
    pub median: f64,
    pub p90: f64,
    pub p99: f64,
    pub max: f64,
}

/// Thread-safe latency sample set.
///
/// Every sample is retained and sorted once during [`LatencyRecorder::finalize`].
#[derive(Debug, Default)]
pub struct LatencyRecorder {
    samples: Mutex<Vec<f64>>,
}

impl LatencyRecorder {
    /// Records a single latency sample, in milliseconds.
    #[inline]
    pub fn record(&self, ms: f64) {
        self.samples().push(ms);
    }

    /// Returns the number of recorded samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calculates the latency summary over all recorded samples.
    ///
    /// Uses the nearest-rank method: for percentile "p" over "n" sorted
    /// samples the value at index `ceil(p * n) - 1` is selected, clamped to
    /// `[0, n - 1]`. No interpolation is performed.
    ///
    /// An empty set yields all zeros.
    pub fn finalize(&self) -> Percentiles {
        let mut sorted = self.samples().clone();
        if sorted.is_empty() {
            return Percentiles::default();
        }
        sorted.sort_by(f64::total_cmp);

        Percentiles {
            min: sorted[0],
            median: nearest_rank(&sorted, P50),
            p90: nearest_rank(&sorted, P90),
            p99: nearest_rank(&sorted, P99),
            max: nearest_rank(&sorted, P100),
        }
    }

    #[inline]
    fn samples(&self) -> MutexGuard<'_, Vec<f64>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Selects the percentile "q" given in per-myriad units from the sorted,
/// non-empty slice.
#[inline]
fn nearest_rank(sorted: &[f64], q: u64) -> f64 {
    let n = sorted.len() as u64;
    let rank = (q * n).div_ceil(P100);
    let idx = rank.saturating_sub(1).min(n - 1);

    sorted[idx as usize]
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use super::*;

    fn recorder(samples: &[f64]) -> LatencyRecorder {
        let r = LatencyRecorder::default();
        for &v in samples {
            r.record(v);
        }
        r
    }

    #[test]
    fn test_five_samples() {
        let p = recorder(&[5.0, 1.0, 9.0, 3.0, 7.0]).finalize();

        assert_eq!(1.0, p.min);
        assert_eq!(5.0, p.median);
        // ceil(0.9 * 5) - 1 = 4 and ceil(0.99 * 5) - 1 = 4.
        assert_eq!(9.0, p.p90);
        assert_eq!(9.0, p.p99);
        assert_eq!(9.0, p.max);
    }

    #[test]
    fn test_empty_is_zero() {
        let r = LatencyRecorder::default();

        assert!(r.is_empty());
        assert_eq!(Percentiles::default(), r.finalize());
    }

    #[test]
    fn test_single_sample() {
        let p = recorder(&[42.5]).finalize();

        assert_eq!(
            Percentiles {
                min: 42.5,
                median: 42.5,
                p90: 42.5,
                p99: 42.5,
                max: 42.5
            },
            p
        );
    }

    #[test]
    fn test_hundred_samples() {
        let samples: Vec<f64> = (1..=100).rev().map(|v| v as f64).collect();
        let p = recorder(&samples).finalize();

        assert_eq!(1.0, p.min);
        assert_eq!(50.0, p.median);
        assert_eq!(90.0, p.p90);
        assert_eq!(99.0, p.p99);
        assert_eq!(100.0, p.max);
    }

    #[test]
    fn test_even_median_takes_lower() {
        let p = recorder(&[4.0, 1.0, 3.0, 2.0]).finalize();

        assert_eq!(2.0, p.median);
    }

    #[test]
    fn test_finalize_does_not_consume() {
        let r = recorder(&[3.0, 1.0]);
        assert_eq!(r.finalize(), r.finalize());
        assert_eq!(2, r.len());
    }

    #[test]
    fn test_concurrent_record() {
        let r = Arc::new(LatencyRecorder::default());

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let r = r.clone();
                thread::spawn(move || {
                    for v in 0..1000 {
                        r.record(v as f64);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(8000, r.len());
        assert_eq!(0.0, r.finalize().min);
        assert_eq!(999.0, r.finalize().max);
    }
}
