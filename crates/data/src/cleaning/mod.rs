//! Cleaners for the two raw input streams.
//!
//! Both cleaners are pure: they take owned rows and return the cleaned rows
//! together with a report of what was removed at each step.

pub mod market;
pub mod posts;

pub use market::{MarketCleaner, MarketCleaningReport};
pub use posts::{PostCleaner, PostCleaningReport, REMOVAL_SENTINELS, URL_MARKER};
