//! Pooled-variance two-sample t-test.
//!
//! Comparing runs of the same benchmark on the same machine across two
//! commits justifies the equal-variance assumption, and pooling keeps
//! more degrees of freedom than Welch on the small round counts the
//! runner produces.

use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestResult {
    pub t: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    /// `1 - p_value`, the number the event gates compare against.
    pub confidence: f64,
}

/// Two-sided pooled t-test between two samples.
///
/// Degenerate inputs resolve conservatively: either sample empty means no
/// evidence, confidence 0. Zero pooled variance means the samples are
/// exact; equal means give confidence 0 and different means confidence 1.
pub fn pooled_t_test(a: &[f64], b: &[f64]) -> TTestResult {
    let (na, nb) = (a.len(), b.len());
    if na == 0 || nb == 0 {
        return TTestResult {
            t: 0.0,
            degrees_of_freedom: 0.0,
            p_value: 1.0,
            confidence: 0.0,
        };
    }

    let mean_a = a.iter().sum::<f64>() / na as f64;
    let mean_b = b.iter().sum::<f64>() / nb as f64;
    let ss_a: f64 = a.iter().map(|v| (v - mean_a).powi(2)).sum();
    let ss_b: f64 = b.iter().map(|v| (v - mean_b).powi(2)).sum();

    let df = (na + nb).saturating_sub(2) as f64;
    if df < 1.0 {
        // Two single samples: no spread information on either side.
        return TTestResult {
            t: 0.0,
            degrees_of_freedom: df,
            p_value: 1.0,
            confidence: 0.0,
        };
    }

    let pooled_var = (ss_a + ss_b) / df;
    if pooled_var == 0.0 {
        let (p, conf) = if mean_a == mean_b { (1.0, 0.0) } else { (0.0, 1.0) };
        return TTestResult {
            t: if mean_a == mean_b { 0.0 } else { f64::INFINITY },
            degrees_of_freedom: df,
            p_value: p,
            confidence: conf,
        };
    }

    let std_err = (pooled_var * (1.0 / na as f64 + 1.0 / nb as f64)).sqrt();
    let t = (mean_a - mean_b) / std_err;

    let p_value = match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * dist.cdf(-t.abs()),
        Err(_) => 1.0,
    };

    TTestResult {
        t,
        degrees_of_freedom: df,
        p_value,
        confidence: 1.0 - p_value,
    }
}
