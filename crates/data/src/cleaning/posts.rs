//! Post cleaner: drops removed/deleted posts and posts carrying links.

use tracing::debug;

use crate::models::RawPost;

/// Bodies that mark a post as removed by moderators or deleted by its author.
pub const REMOVAL_SENTINELS: [&str; 2] = ["[removed]", "[deleted]"];

/// Case-insensitive substring that marks a link in a title or body.
pub const URL_MARKER: &str = "http";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PostCleaningReport {
    pub input: usize,
    pub removed_deleted: usize,
    pub removed_urls: usize,
    pub retained: usize,
}

impl PostCleaningReport {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Input: {}, Removed/deleted: {}, With URLs: {}, Retained: {}",
            self.input, self.removed_deleted, self.removed_urls, self.retained
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PostCleaner;

impl PostCleaner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Applies the removal-sentinel filter, then the URL filter.
    #[must_use]
    pub fn clean(&self, posts: Vec<RawPost>) -> (Vec<RawPost>, PostCleaningReport) {
        let mut report = PostCleaningReport {
            input: posts.len(),
            ..PostCleaningReport::default()
        };

        let mut kept: Vec<RawPost> = posts.into_iter().filter(|p| !is_removed(p)).collect();
        report.removed_deleted = report.input - kept.len();

        let before = kept.len();
        kept.retain(|p| !contains_url(p));
        report.removed_urls = before - kept.len();
        report.retained = kept.len();

        debug!("Post cleaning: {}", report.summary());
        (kept, report)
    }
}

fn is_removed(post: &RawPost) -> bool {
    let body = post.body_or_empty().trim();
    REMOVAL_SENTINELS
        .iter()
        .any(|sentinel| body.eq_ignore_ascii_case(sentinel))
}

fn contains_url(post: &RawPost) -> bool {
    post.title.to_lowercase().contains(URL_MARKER)
        || post.body_or_empty().to_lowercase().contains(URL_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(id: &str, title: &str, body: Option<&str>) -> RawPost {
        RawPost {
            id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            community: "CryptoCurrency".to_string(),
            title: title.to_string(),
            body: body.map(str::to_string),
            score: 0,
            comment_count: 0,
            mentioned_symbols: vec!["BTC".to_string()],
        }
    }

    #[test]
    fn removed_body_is_dropped() {
        let (kept, report) = PostCleaner::new().clean(vec![post("a", "btc", Some("[removed]"))]);
        assert!(kept.is_empty());
        assert_eq!(report.removed_deleted, 1);
    }

    #[test]
    fn deleted_sentinel_matches_case_insensitively() {
        let (kept, _) = PostCleaner::new().clean(vec![post("a", "btc", Some("  [DELETED] "))]);
        assert!(kept.is_empty());
    }

    #[test]
    fn sentinel_inside_longer_text_is_kept() {
        let (kept, _) = PostCleaner::new().clean(vec![post(
            "a",
            "btc",
            Some("my comment was [removed] again"),
        )]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn title_with_url_is_dropped() {
        let (kept, report) =
            PostCleaner::new().clean(vec![post("a", "see http://example.com", None)]);
        assert!(kept.is_empty());
        assert_eq!(report.removed_urls, 1);
    }

    #[test]
    fn body_with_url_is_dropped() {
        let (kept, _) =
            PostCleaner::new().clean(vec![post("a", "eth", Some("HTTPS://example.com/chart"))]);
        assert!(kept.is_empty());
    }

    #[test]
    fn ordinary_post_and_missing_body_are_retained() {
        let (kept, report) = PostCleaner::new().clean(vec![
            post("a", "Bitcoin rallies", Some("good news for holders")),
            post("b", "ETH gas fees", None),
            post("c", "x", Some("[removed]")),
        ]);

        assert_eq!(kept.len(), 2);
        assert_eq!(
            report,
            PostCleaningReport {
                input: 3,
                removed_deleted: 1,
                removed_urls: 0,
                retained: 2,
            }
        );
    }
}
