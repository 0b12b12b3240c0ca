//! Statistical validation of sentiment features against future returns.
//!
//! This module provides correlation analysis (Pearson with exact Student-t
//! p-values, Spearman over average ranks), the hourly feature series shared
//! with the predictive model, the correlation sweep engine and its report.

mod correlation;
pub mod features;
mod ic;
mod report;
mod sweep;

pub use correlation::{
    analyze_pearson, correlation_p_value, pearson_correlation, student_t_two_sided_p,
    CorrelationAnalysis,
};
pub use ic::{analyze_spearman, calculate_ranks, spearman_correlation};
pub use report::{top_significant, SweepReport};
pub use sweep::{CorrelationSweep, SweepStats};
