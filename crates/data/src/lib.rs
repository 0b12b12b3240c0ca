//! Data model, storage and cleaning for the crypto sentiment pipeline.
//!
//! This crate provides:
//! - Data models for bars, posts, the master hourly table and sweep results
//! - Parquet storage with explicit timestamp timezone contracts
//! - CSV storage for tabular results
//! - Market and post cleaners

pub mod cleaning;
pub mod csv_storage;
pub mod models;
pub mod parquet_storage;

pub use cleaning::{MarketCleaner, MarketCleaningReport, PostCleaner, PostCleaningReport};
pub use csv_storage::CsvStorage;
pub use parquet_storage::ParquetStorage;

pub use models::{
    column_name, floor_to_hour, CorrelationResult, MasterRow, MasterTable, OhlcvBar, PostSet,
    PricePoint, RawPost, ScoredPost, SentimentAggregate, SentimentRecord,
};
