pub mod collector;
pub mod predictive;
pub mod sentiment;
pub mod tagging;
pub mod unify;
pub mod validation;

// Re-export collectors for convenience
pub use collector::{
    normalize_label, ChartInterval, FetchStats, MarketDataSource, PostSource, RedditCollector,
    YahooChartCollector,
};

pub use predictive::{PredictionOutcome, PredictiveModel};
pub use sentiment::{score_posts, LexiconScorer, SentimentScorer};
pub use tagging::{tag_posts, tag_symbols};
pub use unify::{localize_utc, TimeSeriesUnifier, UnifyReport};

// Re-export validation framework
pub use validation::{
    analyze_pearson, analyze_spearman, calculate_ranks, top_significant, CorrelationAnalysis,
    CorrelationSweep, SweepReport, SweepStats,
};
