//! Reddit post collector.
//!
//! Authenticates with the OAuth password grant, then pages through
//! `/r/{community}/new` with the `after` cursor until the per-community limit
//! is reached or the listing runs out.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

use cryptosent_core::RedditCredentials;
use cryptosent_data::{PostSet, RawPost};

use super::{FetchStats, PostSource};

/// Listing page size (Reddit caps listings at 100 per request)
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Post collector for Reddit communities.
pub struct RedditCollector {
    client: reqwest::Client,
    credentials: RedditCredentials,
    auth_url: String,
    api_url: String,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    after: Option<String>,
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Submission,
}

#[derive(Debug, Deserialize)]
struct Submission {
    id: String,
    created_utc: f64,
    subreddit: String,
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
}

impl Submission {
    fn into_post(self) -> Option<RawPost> {
        let timestamp =
            DateTime::<Utc>::from_timestamp_millis((self.created_utc * 1000.0).round() as i64)?;
        Some(RawPost {
            id: self.id,
            timestamp,
            community: self.subreddit,
            title: self.title,
            body: (!self.selftext.is_empty()).then_some(self.selftext),
            score: self.score,
            comment_count: self.num_comments,
            mentioned_symbols: Vec::new(),
        })
    }
}

impl RedditCollector {
    /// Creates a collector with custom endpoints and rate limit.
    ///
    /// # Arguments
    /// * `auth_url` - Base URL serving `/api/v1/access_token`
    /// * `api_url` - Base URL serving `/r/{community}/new`
    /// * `rate_limit_per_second` - Maximum requests per second (0 is treated as 1)
    #[must_use]
    pub fn with_config(
        credentials: RedditCredentials,
        auth_url: &str,
        api_url: &str,
        rate_limit_per_second: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(credentials.user_agent.clone())
            .build()
            .unwrap_or_default();

        let quota = Quota::per_second(NonZeroU32::new(rate_limit_per_second).unwrap_or(NonZeroU32::MIN));

        Self {
            client,
            credentials,
            auth_url: auth_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    /// Obtains a bearer token with the password grant.
    async fn authenticate(&self) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/api/v1/access_token", self.auth_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .context("Failed to send token request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Reddit auth error ({}): {}", status, error_text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        match (token.access_token, token.error) {
            (Some(access_token), _) => Ok(access_token),
            (None, Some(error)) => Err(anyhow!("Reddit auth rejected: {}", error)),
            (None, None) => Err(anyhow!("Reddit auth response carried no token")),
        }
    }

    /// Fetches up to `limit` newest posts from one community.
    async fn fetch_community(
        &self,
        token: &str,
        community: &str,
        limit: usize,
        stats: &mut FetchStats,
    ) -> Result<Vec<RawPost>> {
        let url = format!("{}/r/{}/new", self.api_url, community);
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        while posts.len() < limit {
            self.rate_limiter.until_ready().await;

            let page_size = (limit - posts.len()).min(DEFAULT_PAGE_SIZE).to_string();
            let mut query = vec![("limit", page_size), ("raw_json", "1".to_string())];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&query)
                .send()
                .await
                .with_context(|| format!("Failed to fetch r/{community}"))?;
            stats.total_requests += 1;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(anyhow!("Reddit API error ({}): {}", status, error_text));
            }

            let listing: Listing = response
                .json()
                .await
                .with_context(|| format!("Failed to parse listing for r/{community}"))?;

            if listing.data.children.is_empty() {
                break;
            }

            for child in listing.data.children {
                match child.data.into_post() {
                    Some(post) => posts.push(post),
                    None => stats.incomplete_skipped += 1,
                }
            }

            match listing.data.after {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        posts.truncate(limit);
        Ok(posts)
    }
}

#[async_trait]
impl PostSource for RedditCollector {
    async fn fetch_posts(
        &self,
        communities: &[String],
        limit: usize,
    ) -> Result<(Vec<RawPost>, FetchStats)> {
        let token = self.authenticate().await?;
        let mut stats = FetchStats::new();
        let mut set = PostSet::new();

        for community in communities {
            match self.fetch_community(&token, community, limit, &mut stats).await {
                Ok(posts) => {
                    tracing::info!("Fetched {} posts from r/{}", posts.len(), community);
                    stats.total_records += posts.len() as u64;
                    set.extend(posts);
                }
                Err(e) => {
                    stats.failed_units += 1;
                    tracing::error!("Skipping r/{}: {:#}", community, e);
                }
            }
        }

        stats.duplicates_skipped = set.duplicates() as u64;
        Ok((set.into_vec(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> RedditCredentials {
        RedditCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "cryptosent-test/0.1".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    fn submission(id: &str, sub: &str, selftext: &str) -> serde_json::Value {
        serde_json::json!({
            "kind": "t3",
            "data": {
                "id": id,
                "created_utc": 1735689600.0,
                "subreddit": sub,
                "title": format!("post {id}"),
                "selftext": selftext,
                "score": 12,
                "num_comments": 4
            }
        })
    }

    fn listing(children: Vec<serde_json::Value>, after: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "kind": "Listing",
            "data": { "after": after, "children": children }
        })
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "token_type": "bearer",
                "expires_in": 86400
            })))
            .mount(server)
            .await;
    }

    fn collector(server: &MockServer) -> RedditCollector {
        RedditCollector::with_config(credentials(), &server.uri(), &server.uri(), 100)
    }

    #[tokio::test]
    async fn test_fetch_paginates_with_after_cursor() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/r/Bitcoin/new"))
            .and(query_param("after", "t3_b"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                vec![submission("c", "Bitcoin", "")],
                None,
            )))
            .with_priority(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/r/Bitcoin/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                vec![
                    submission("a", "Bitcoin", "btc to the moon"),
                    submission("b", "Bitcoin", ""),
                ],
                Some("t3_b"),
            )))
            .with_priority(2)
            .mount(&mock_server)
            .await;

        let (posts, stats) = collector(&mock_server)
            .fetch_posts(&["Bitcoin".to_string()], 10)
            .await
            .unwrap();

        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(posts[0].body.as_deref(), Some("btc to the moon"));
        assert!(posts[1].body.is_none());
        assert_eq!(posts[0].comment_count, 4);
        assert_eq!(stats.total_requests, 2);
    }

    #[tokio::test]
    async fn test_fetch_respects_limit() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/r/ethereum/new"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                vec![
                    submission("x", "ethereum", "eth"),
                    submission("y", "ethereum", "eth"),
                ],
                Some("t3_y"),
            )))
            .mount(&mock_server)
            .await;

        let (posts, _) = collector(&mock_server)
            .fetch_posts(&["ethereum".to_string()], 2)
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_community_is_skipped_and_duplicates_collapse() {
        let mock_server = MockServer::start().await;
        mount_token(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/r/CryptoCurrency/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                vec![
                    submission("dup", "CryptoCurrency", "first"),
                    submission("z", "CryptoCurrency", ""),
                ],
                None,
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/r/Bitcoin/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                vec![submission("dup", "Bitcoin", "second")],
                None,
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/r/private/new"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&mock_server)
            .await;

        let communities = vec![
            "CryptoCurrency".to_string(),
            "private".to_string(),
            "Bitcoin".to_string(),
        ];
        let (posts, stats) = collector(&mock_server)
            .fetch_posts(&communities, 50)
            .await
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].body.as_deref(), Some("first"));
        assert_eq!(stats.failed_units, 1);
        assert_eq!(stats.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn test_auth_rejection_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&mock_server)
            .await;

        let err = collector(&mock_server)
            .fetch_posts(&["Bitcoin".to_string()], 10)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid_grant"));
    }
}
