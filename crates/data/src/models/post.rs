//! Discussion post models.
//!
//! A post moves through the pipeline as `RawPost` (acquired, tagged),
//! `ScoredPost` (annotated with a sentiment score) and finally
//! `SentimentRecord`, the lean naive-timestamp view the unifier consumes.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A discussion post as returned by the social post source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    /// Unique post identifier
    pub id: String,
    /// Creation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Community (subreddit) name
    pub community: String,
    pub title: String,
    /// Self-text; absent for link posts
    pub body: Option<String>,
    pub score: i64,
    pub comment_count: i64,
    /// Asset symbols the post mentions, in keyword-map order
    pub mentioned_symbols: Vec<String>,
}

impl RawPost {
    /// Title and body joined by a space, with a missing body treated as empty.
    #[must_use]
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.body.as_deref().unwrap_or(""))
    }

    /// Body text, with a missing body treated as empty.
    #[must_use]
    pub fn body_or_empty(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// Set of posts keyed by id. The first occurrence of an id wins; later
/// duplicates are ignored. Insertion order is preserved.
#[derive(Debug, Default, Clone)]
pub struct PostSet {
    seen: HashSet<String>,
    posts: Vec<RawPost>,
    duplicates: usize,
}

impl PostSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a post unless its id is already present. Returns true if inserted.
    pub fn insert(&mut self, post: RawPost) -> bool {
        if self.seen.contains(&post.id) {
            self.duplicates += 1;
            return false;
        }
        self.seen.insert(post.id.clone());
        self.posts.push(post);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Number of inserts rejected as duplicates.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<RawPost> {
        self.posts
    }
}

impl Extend<RawPost> for PostSet {
    fn extend<T: IntoIterator<Item = RawPost>>(&mut self, iter: T) {
        for post in iter {
            self.insert(post);
        }
    }
}

impl FromIterator<RawPost> for PostSet {
    fn from_iter<T: IntoIterator<Item = RawPost>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// A post annotated with its sentiment score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    pub post: RawPost,
    /// Compound score in [-1, 1]
    pub sentiment_score: f64,
}

/// Sentiment view of a post as read back from the sentiment file.
///
/// The timestamp is naive: it represents UTC wall-clock time but carries no
/// timezone annotation, and must be localized before it meets price data.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentRecord {
    pub id: String,
    pub timestamp: NaiveDateTime,
    pub mentioned_symbols: Vec<String>,
    pub sentiment_score: f64,
}
