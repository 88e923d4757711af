//! Sample-size solver for the significance scheduler.

use super::interval::sample_stats;

/// Normal critical value tier for the requested confidence. The solver
/// deliberately uses the coarse three-tier table rather than the exact
/// quantile so the round counts it asks for stay stable between passes.
fn z_for_confidence(confidence: f64) -> f64 {
    if confidence <= 0.90 {
        1.645
    } else if confidence <= 0.95 {
        1.960
    } else {
        2.576
    }
}

/// Total number of samples needed for the relative margin of `data` to
/// shrink below `target_margin` at the given confidence.
///
/// Returns at least 2 when any estimate is possible at all: one sample can
/// never bound its own spread. With no samples or a zero mean the answer
/// is 2, the minimum that produces an interval. A zero-variance sample
/// already satisfies any margin, so the current count is returned.
pub fn required_sample_count(data: &[f64], target_margin: f64, confidence: f64) -> usize {
    let stats = sample_stats(data, confidence);
    if stats.n < 2 || stats.mean == 0.0 {
        return stats.n.max(2);
    }
    if stats.std_dev == 0.0 {
        return stats.n;
    }

    let rel_dev = stats.std_dev / stats.mean.abs();
    let z = z_for_confidence(confidence);
    let exact = (z * rel_dev / target_margin).powi(2);
    (exact.ceil() as usize).max(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_two_samples_to_start() {
        assert_eq!(required_sample_count(&[], 0.025, 0.95), 2);
        assert_eq!(required_sample_count(&[10.0], 0.025, 0.95), 2);
    }

    #[test]
    fn zero_variance_is_already_satisfied() {
        assert_eq!(required_sample_count(&[3.0, 3.0, 3.0], 0.025, 0.95), 3);
    }

    #[test]
    fn matches_the_closed_form() {
        // rel_dev = 0.1, z = 1.96, margin 0.025 -> (1.96 * 4)^2 = 61.4656
        let data = [0.9, 1.1];
        let rel_dev = {
            let mean = 1.0_f64;
            let var = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 1.0;
            var.sqrt() / mean
        };
        let expected = ((1.96 * rel_dev / 0.025_f64).powi(2)).ceil() as usize;
        assert_eq!(required_sample_count(&data, 0.025, 0.95), expected);
    }

    #[test]
    fn tighter_margin_needs_more_samples() {
        let data = [0.9, 1.0, 1.1];
        assert!(
            required_sample_count(&data, 0.01, 0.95) > required_sample_count(&data, 0.05, 0.95)
        );
    }

    #[test]
    fn higher_confidence_needs_more_samples() {
        let data = [0.9, 1.0, 1.1];
        assert!(
            required_sample_count(&data, 0.025, 0.99) > required_sample_count(&data, 0.025, 0.90)
        );
    }
}
