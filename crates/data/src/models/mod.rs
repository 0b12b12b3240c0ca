//! Data models for the sentiment pipeline.
//!
//! Prices are `f64`: every downstream consumer is statistical.

pub mod correlation;
pub mod master;
pub mod ohlcv;
pub mod post;

pub use correlation::CorrelationResult;
pub use master::{
    column_name, MasterRow, MasterTable, PricePoint, SentimentAggregate, POST_COUNT_SUFFIX,
    PRICE_FIELDS, SENTIMENT_MEAN_SUFFIX,
};
pub use ohlcv::{floor_to_hour, OhlcvBar};
pub use post::{PostSet, RawPost, ScoredPost, SentimentRecord};
