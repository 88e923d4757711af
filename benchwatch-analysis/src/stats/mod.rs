//! Statistical comparator.
//!
//! Point estimates and credible intervals for one result, the pooled
//! two-sample t-test between adjacent commits, and the sample-size solver
//! the scheduler uses to top up under-sampled results.

pub mod interval;
pub mod sample_size;
pub mod ttest;

pub use interval::{sample_stats, SampleStats};
pub use sample_size::required_sample_count;
pub use ttest::{pooled_t_test, TTestResult};

use crate::report::BenchResult;

/// Credibility level used for every result interval.
pub const CREDIBILITY: f64 = 0.95;

impl BenchResult {
    /// Point estimate: the sample mean, cached after the first request.
    /// 0 for a result without data.
    pub fn result(&self) -> f64 {
        if let Some(mean) = self.mean_cache.get() {
            return mean;
        }
        let mean = sample_stats(&self.data, CREDIBILITY).mean;
        self.mean_cache.set(Some(mean));
        mean
    }

    /// Fractional confidence margin: the 95% credible half-width divided by
    /// the mean. 0 when the mean is 0 (no information, not infinite regret);
    /// infinite when fewer than two samples exist.
    pub fn margin(&self) -> f64 {
        if let Some(margin) = self.margin_cache.get() {
            return margin;
        }
        let stats = sample_stats(&self.data, CREDIBILITY);
        let margin = if stats.mean == 0.0 {
            0.0
        } else {
            stats.half_width / stats.mean.abs()
        };
        self.margin_cache.set(Some(margin));
        margin
    }

    /// Total rounds needed to reach `target_margin` at `confidence`.
    /// Recomputed on every call; the answer changes with every new sample.
    pub fn required_rounds(&self, target_margin: f64, confidence: f64) -> usize {
        required_sample_count(&self.data, target_margin, confidence)
    }
}

#[cfg(test)]
mod tests {
    use crate::report::{BenchResult, TestType};

    #[test]
    fn result_mean_is_cached_until_invalidated() {
        let mut result = BenchResult::new(0, TestType::Bench, "f");
        result.data = vec![10.0, 20.0];
        assert!((result.result() - 15.0).abs() < 1e-12);

        // The cache keeps the stale value until explicitly invalidated.
        result.data.push(90.0);
        assert!((result.result() - 15.0).abs() < 1e-12);
        result.invalidate_caches();
        assert!((result.result() - 40.0).abs() < 1e-12);
    }

    #[test]
    fn single_sample_margin_is_infinite() {
        let mut result = BenchResult::new(0, TestType::Bench, "f");
        result.data = vec![42.0];
        assert!(result.margin().is_infinite());
    }

    #[test]
    fn zero_mean_margin_is_zero() {
        let mut result = BenchResult::new(0, TestType::Bench, "f");
        result.data = vec![1.0, -1.0];
        assert_eq!(result.margin(), 0.0);
    }
}
