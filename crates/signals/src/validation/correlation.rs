//! Pearson correlation with an exact Student-t p-value.
//!
//! The two-sided p-value of a correlation coefficient `r` over `n` samples
//! uses `t = r * sqrt((n-2) / (1-r^2))`, which follows a t-distribution with
//! `n-2` degrees of freedom. The tail probability is evaluated through the
//! regularized incomplete beta function.

use serde::{Deserialize, Serialize};

/// Correlation coefficient, its two-sided p-value and the sample size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAnalysis {
    /// Correlation coefficient in [-1, 1]; NaN when undefined
    pub coefficient: f64,
    /// Two-sided p-value; NaN when undefined
    pub p_value: f64,
    /// Number of paired observations used
    pub sample_size: usize,
}

impl CorrelationAnalysis {
    /// Returns true if the p-value is below `alpha`. Undefined results never are.
    #[must_use]
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Calculates the Pearson correlation coefficient between two series.
///
/// Returns NaN if the lengths differ, fewer than two points are given, or
/// either series is constant.
#[must_use]
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }

    (covariance / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

/// Two-sided p-value for a correlation coefficient over `n` samples.
#[must_use]
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if r.is_nan() || n < 3 {
        return f64::NAN;
    }
    if r.abs() >= 1.0 {
        return 0.0;
    }

    let df = n as f64 - 2.0;
    let t_stat = r * (df / (1.0 - r * r)).sqrt();
    student_t_two_sided_p(t_stat, df)
}

/// Pearson coefficient and p-value for paired observations.
#[must_use]
pub fn analyze_pearson(x: &[f64], y: &[f64]) -> CorrelationAnalysis {
    let coefficient = pearson_correlation(x, y);
    CorrelationAnalysis {
        coefficient,
        p_value: correlation_p_value(coefficient, x.len()),
        sample_size: x.len(),
    }
}

/// `P(|T| >= |t|)` for a Student-t variable with `df` degrees of freedom.
#[must_use]
pub fn student_t_two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Regularized incomplete beta function `I_x(a, b)`.
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges fastest on this side of the mean.
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Modified Lentz evaluation of the incomplete beta continued fraction.
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 3.0e-14;
    const TINY: f64 = 1.0e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    h
}

/// Lanczos approximation of `ln(Gamma(x))` for `x > 0`.
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let pi = std::f64::consts::PI;
        return pi.ln() - (pi * x).sin().ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    for (i, &c) in COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_perfect_linear_relations() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let up: Vec<f64> = x.iter().map(|v| 3.0 * v - 2.0).collect();
        let down: Vec<f64> = x.iter().map(|v| -0.5 * v + 1.0).collect();

        assert!((pearson_correlation(&x, &up) - 1.0).abs() < 1e-12);
        assert!((pearson_correlation(&x, &down) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_constant_series_is_undefined() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]);
        assert!(r.is_nan());
        assert!(correlation_p_value(r, 3).is_nan());
    }

    #[test]
    fn pearson_mismatched_lengths_is_undefined() {
        assert!(pearson_correlation(&[1.0, 2.0], &[1.0]).is_nan());
    }

    #[test]
    fn t_distribution_matches_critical_values() {
        // Two-sided 5% critical values.
        assert!((student_t_two_sided_p(2.228_139, 10.0) - 0.05).abs() < 1e-4);
        assert!((student_t_two_sided_p(1.983_972, 100.0) - 0.05).abs() < 1e-4);
        // Two-sided 1% critical value for df = 5.
        assert!((student_t_two_sided_p(4.032_143, 5.0) - 0.01).abs() < 1e-4);
        assert!((student_t_two_sided_p(0.0, 12.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn incomplete_beta_reduces_to_identity_for_unit_parameters() {
        for x in [0.1, 0.25, 0.5, 0.9] {
            assert!((regularized_incomplete_beta(1.0, 1.0, x) - x).abs() < 1e-10);
        }
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!((ln_gamma(1.0)).abs() < 1e-10);
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn p_value_for_known_correlation() {
        // r = 0.5, n = 20 -> t = 2.4495, df = 18 -> p ~= 0.0247
        let p = correlation_p_value(0.5, 20);
        assert!((p - 0.0247).abs() < 5e-4, "p was {p}");
    }

    #[test]
    fn perfect_correlation_has_zero_p_value() {
        assert_eq!(correlation_p_value(1.0, 60), 0.0);
        assert!(analyze_pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).is_significant(0.05));
    }

    #[test]
    fn too_few_samples_is_undefined() {
        assert!(correlation_p_value(0.9, 2).is_nan());
        assert!(!analyze_pearson(&[1.0], &[1.0]).is_significant(0.05));
    }
}
