//! Post sentiment scoring.

mod lexicon;

use cryptosent_data::{RawPost, ScoredPost};

pub use lexicon::LexiconScorer;

/// Maps free text to a compound polarity score in `[-1, 1]`.
///
/// Implementations must be stateless and deterministic for identical input.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// Scores each post's title and body (joined by a space).
#[must_use]
pub fn score_posts<S: SentimentScorer + ?Sized>(scorer: &S, posts: Vec<RawPost>) -> Vec<ScoredPost> {
    posts
        .into_iter()
        .map(|post| {
            let sentiment_score = scorer.score(&post.combined_text());
            ScoredPost {
                post,
                sentiment_score,
            }
        })
        .collect()
}
