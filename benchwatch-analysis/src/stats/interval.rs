//! Student-t credible interval over a sample.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Summary of one sample: mean and the half-width of the symmetric
/// credible interval around it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    /// Half-width of the credible interval. Infinite when `n < 2`.
    pub half_width: f64,
}

/// Mean and credible interval at the given credibility level.
///
/// With no samples the mean is 0 and the interval is unbounded. With one
/// sample the mean is that sample and the interval is still unbounded:
/// a single observation carries no spread information. Zero variance
/// collapses the interval to a point.
pub fn sample_stats(data: &[f64], credibility: f64) -> SampleStats {
    let n = data.len();
    if n == 0 {
        return SampleStats {
            n: 0,
            mean: 0.0,
            std_dev: 0.0,
            half_width: f64::INFINITY,
        };
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return SampleStats {
            n,
            mean,
            std_dev: 0.0,
            half_width: f64::INFINITY,
        };
    }

    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return SampleStats {
            n,
            mean,
            std_dev,
            half_width: 0.0,
        };
    }

    let half_width = t_quantile(credibility, (n - 1) as f64) * std_dev / (n as f64).sqrt();
    SampleStats {
        n,
        mean,
        std_dev,
        half_width,
    }
}

/// Two-sided Student-t critical value for the given credibility level.
pub(crate) fn t_quantile(credibility: f64, freedom: f64) -> f64 {
    // freedom >= 1 here, so construction cannot fail.
    match StudentsT::new(0.0, 1.0, freedom) {
        Ok(dist) => dist.inverse_cdf(0.5 + credibility / 2.0),
        Err(_) => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_is_unbounded() {
        let s = sample_stats(&[], 0.95);
        assert_eq!(s.mean, 0.0);
        assert!(s.half_width.is_infinite());
    }

    #[test]
    fn constant_sample_has_point_interval() {
        let s = sample_stats(&[5.0, 5.0, 5.0], 0.95);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.half_width, 0.0);
    }

    #[test]
    fn interval_matches_hand_computation() {
        // n = 4, mean 2.5, s = sqrt(5/3), t_{0.975,3} = 3.18245
        let s = sample_stats(&[1.0, 2.0, 3.0, 4.0], 0.95);
        assert!((s.mean - 2.5).abs() < 1e-12);
        let expected = 3.182446 * (5.0_f64 / 3.0).sqrt() / 2.0;
        assert!((s.half_width - expected).abs() < 1e-4);
    }

    #[test]
    fn wider_credibility_widens_the_interval() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(sample_stats(&data, 0.99).half_width > sample_stats(&data, 0.90).half_width);
    }
}
