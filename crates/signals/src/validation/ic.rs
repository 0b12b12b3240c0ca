//! Spearman rank correlation.
//!
//! The Spearman coefficient is the Pearson correlation of the ranks. It
//! measures how well a feature orders outcomes, regardless of the exact
//! values, and is robust to the heavy tails typical of returns.

use super::correlation::{correlation_p_value, pearson_correlation, CorrelationAnalysis};

/// Calculates ranks for a slice of values, handling ties with average rank.
///
/// # Arguments
/// * `values` - Slice of values to rank
///
/// # Returns
/// Vector of ranks (1-based, with ties averaged)
#[must_use]
pub fn calculate_ranks(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }

    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = vec![0.0; n];

    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && indexed[j].1 == indexed[i].1 {
            j += 1;
        }

        // Positions i..j share ranks (i+1)..=j; their mean is (i + 1 + j) / 2.
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for entry in &indexed[i..j] {
            ranks[entry.0] = avg_rank;
        }

        i = j;
    }

    ranks
}

/// Calculates the Spearman rank correlation coefficient. NaN when undefined.
#[must_use]
pub fn spearman_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }

    pearson_correlation(&calculate_ranks(x), &calculate_ranks(y))
}

/// Spearman coefficient and two-sided p-value for paired observations.
#[must_use]
pub fn analyze_spearman(x: &[f64], y: &[f64]) -> CorrelationAnalysis {
    let coefficient = spearman_correlation(x, y);
    CorrelationAnalysis {
        coefficient,
        p_value: correlation_p_value(coefficient, x.len()),
        sample_size: x.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_calculated_correctly() {
        let values = vec![3.0, 1.0, 4.0, 1.0, 5.0];
        let ranks = calculate_ranks(&values);

        // Both 1.0 entries share ranks 1 and 2.
        assert_eq!(ranks, vec![3.0, 1.5, 4.0, 1.5, 5.0]);
    }

    #[test]
    fn ranks_of_all_ties_are_the_middle_rank() {
        assert_eq!(calculate_ranks(&[7.0, 7.0, 7.0]), vec![2.0, 2.0, 2.0]);
        assert!(calculate_ranks(&[]).is_empty());
    }

    #[test]
    fn spearman_is_one_for_any_monotonic_relation() {
        let x: Vec<f64> = (1..=20).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| v.powi(3)).collect();

        assert!((spearman_correlation(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn spearman_reversed_order_is_minus_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [10.0, 5.0, 2.0, -1.0];
        assert!((spearman_correlation(&x, &y) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn spearman_constant_series_is_undefined() {
        let analysis = analyze_spearman(&[1.0, 2.0, 3.0, 4.0], &[0.0, 0.0, 0.0, 0.0]);
        assert!(analysis.coefficient.is_nan());
        assert!(analysis.p_value.is_nan());
        assert_eq!(analysis.sample_size, 4);
    }
}
