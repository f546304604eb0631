//! Reddit fetch layer.
//!
//! [`RedditClient`] authenticates against the OAuth2 token endpoint,
//! using the password grant when a script user is configured and
//! app-only client credentials otherwise, and caches the bearer token
//! until shortly before it expires. Listings are paged from
//! `/r/{subreddit}/new` into [`RawPost`] records with top-level
//! comments attached, with a jittered pause between calls.
//!
//! Rate limiting and server errors surface as retryable; credential
//! rejections are fatal and abort the fetch.

mod wire;

use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use admit_core::{RawPost, RedditConfig};

use crate::wire::{usable_comments, CommentData, Listing, PostData};

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Reddit credentials not configured: {0}")]
    Credentials(String),

    #[error("Authentication rejected (status {status})")]
    Auth { status: u16 },

    #[error("Transient API failure (status {status})")]
    Retryable { status: u16 },

    #[error("Unexpected API response (status {status})")]
    Api { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether backing off and retrying can help
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Rate limiting and server errors are worth retrying; credential
/// rejections are not.
fn status_error(status: StatusCode) -> FetchError {
    let code = status.as_u16();
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        FetchError::Retryable { status: code }
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        FetchError::Auth { status: code }
    } else {
        FetchError::Api { status: code }
    }
}

// ============================================================================
// Client
// ============================================================================

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// Reddit serves at most this many listing items per call
const PAGE_LIMIT: usize = 100;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Tokens are refreshed this long before their reported expiry
const TOKEN_SLACK_SECS: u64 = 60;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

/// Authenticated Reddit API client
#[derive(Debug)]
pub struct RedditClient {
    http: Client,
    config: RedditConfig,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    pub fn from_config(config: &RedditConfig) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(FetchError::Credentials(
                "client_id and client_secret are required".to_string(),
            ));
        }
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            config: config.clone(),
            token: Mutex::new(None),
        })
    }

    /// Fetch every configured subreddit in order.
    ///
    /// A subreddit that only fails transiently is logged and skipped so
    /// the remaining ones still run; fatal errors abort the fetch.
    pub async fn fetch_all(&self) -> Result<Vec<RawPost>> {
        let mut posts = Vec::new();
        for subreddit in &self.config.subreddits {
            tracing::info!(subreddit = %subreddit, "fetching subreddit");
            match self.fetch_subreddit(subreddit).await {
                Ok(fetched) => {
                    tracing::info!(
                        subreddit = %subreddit,
                        posts = fetched.len(),
                        "subreddit fetched"
                    );
                    posts.extend(fetched);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(subreddit = %subreddit, error = %e, "subreddit skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(posts)
    }

    /// Fetch one subreddit end to end: listing pages up to the
    /// configured budget, then top-level comments per post.
    pub async fn fetch_subreddit(&self, subreddit: &str) -> Result<Vec<RawPost>> {
        let mut posts = self
            .fetch_new(subreddit, self.config.max_posts_per_subreddit)
            .await?;
        for post in &mut posts {
            self.pause().await;
            match self.fetch_comments(&post.id).await {
                Ok(comments) => post.comments = comments,
                // One rate-limited thread should not sink the listing
                Err(e) if e.is_retryable() => {
                    tracing::warn!(post_id = %post.id, error = %e, "comments skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(posts)
    }

    /// Fetch up to `limit` posts from `/r/{subreddit}/new`, following
    /// the `after` cursor across pages. Pinned, distinguished and
    /// removed posts are skipped and do not count against the limit.
    pub async fn fetch_new(&self, subreddit: &str, limit: usize) -> Result<Vec<RawPost>> {
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        while posts.len() < limit {
            let page = self
                .listing_page(subreddit, limit - posts.len(), after.as_deref())
                .await?;
            let next_after = page.data.after;
            let children = page.data.children;
            if children.is_empty() {
                break;
            }

            for child in children {
                if child.kind != "t3" || !child.data.is_listable() {
                    continue;
                }
                posts.push(child.data.into_raw_post(subreddit));
                if posts.len() >= limit {
                    break;
                }
            }

            after = match next_after {
                Some(cursor) if posts.len() < limit => Some(cursor),
                _ => break,
            };
            self.pause().await;
        }

        tracing::debug!(subreddit, posts = posts.len(), "listing fetched");
        Ok(posts)
    }

    /// Top-level comments for one post, filtered to usable bodies and
    /// capped at the configured budget.
    pub async fn fetch_comments(&self, post_id: &str) -> Result<Vec<String>> {
        let url = format!("{API_BASE}/comments/{post_id}");
        let bearer = self.bearer().await?;
        // Over-fetch so short and deleted comments leave room for real ones
        let fetch_budget = self.config.max_comments_per_post * 2;
        let response = self
            .http
            .get(&url)
            .bearer_auth(&bearer)
            .query(&[
                ("depth", "1".to_string()),
                ("limit", fetch_budget.to_string()),
                ("sort", "top".to_string()),
                ("raw_json", "1".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let listings: Vec<Listing<CommentData>> = response.json().await?;
        Ok(usable_comments(
            &listings,
            self.config.min_comment_length,
            self.config.max_comments_per_post,
        ))
    }

    async fn listing_page(
        &self,
        subreddit: &str,
        want: usize,
        after: Option<&str>,
    ) -> Result<Listing<PostData>> {
        let url = format!("{API_BASE}/r/{subreddit}/new");
        let bearer = self.bearer().await?;
        let mut request = self
            .http
            .get(&url)
            .bearer_auth(&bearer)
            .query(&[
                ("limit", want.min(PAGE_LIMIT).to_string()),
                ("raw_json", "1".to_string()),
            ]);
        if let Some(cursor) = after {
            request = request.query(&[("after", cursor)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Cached bearer token, refreshed when missing or near expiry
    async fn bearer(&self) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.bearer.clone());
            }
        }

        let token = self.request_token().await?;
        let bearer = token.bearer.clone();
        *slot = Some(token);
        Ok(bearer)
    }

    async fn request_token(&self) -> Result<CachedToken> {
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&self.grant_params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The token endpoint rejecting a non-transient request means
            // the credentials themselves are bad
            return Err(
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    FetchError::Retryable {
                        status: status.as_u16(),
                    }
                } else {
                    FetchError::Auth {
                        status: status.as_u16(),
                    }
                },
            );
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.expires_in.saturating_sub(TOKEN_SLACK_SECS).max(1);
        tracing::debug!("access token refreshed");
        Ok(CachedToken {
            bearer: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    /// Password grant when a script user is configured, app-only
    /// client credentials otherwise
    fn grant_params(&self) -> Vec<(&'static str, String)> {
        match (&self.config.username, &self.config.password) {
            (Some(username), Some(password))
                if !username.is_empty() && !password.is_empty() =>
            {
                vec![
                    ("grant_type", "password".to_string()),
                    ("username", username.clone()),
                    ("password", password.clone()),
                ]
            }
            _ => vec![("grant_type", "client_credentials".to_string())],
        }
    }

    /// Jittered pause between API calls
    async fn pause(&self) {
        let (min, max) = (self.config.delay_min_ms, self.config.delay_max_ms);
        let wait = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        if wait > 0 {
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_credentials() -> RedditConfig {
        RedditConfig {
            client_id: "app-id".to_string(),
            client_secret: "app-secret".to_string(),
            ..RedditConfig::default()
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = RedditClient::from_config(&RedditConfig::default()).unwrap_err();
        assert!(matches!(err, FetchError::Credentials(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(status_error(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(status_error(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED),
            FetchError::Auth { status: 401 }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN),
            FetchError::Auth { status: 403 }
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND),
            FetchError::Api { status: 404 }
        ));
        assert!(!status_error(StatusCode::NOT_FOUND).is_retryable());
    }

    #[test]
    fn test_app_only_grant_without_script_user() {
        let client = RedditClient::from_config(&config_with_credentials()).unwrap();
        assert_eq!(
            client.grant_params(),
            [("grant_type", "client_credentials".to_string())]
        );
    }

    #[test]
    fn test_password_grant_with_script_user() {
        let mut config = config_with_credentials();
        config.username = Some("researcher".to_string());
        config.password = Some("hunter2".to_string());
        let client = RedditClient::from_config(&config).unwrap();

        let params = client.grant_params();
        assert_eq!(params[0], ("grant_type", "password".to_string()));
        assert_eq!(params[1], ("username", "researcher".to_string()));
        assert_eq!(params[2], ("password", "hunter2".to_string()));
    }

    #[test]
    fn test_empty_script_user_falls_back_to_app_only() {
        let mut config = config_with_credentials();
        config.username = Some(String::new());
        config.password = Some(String::new());
        let client = RedditClient::from_config(&config).unwrap();
        assert_eq!(
            client.grant_params(),
            [("grant_type", "client_credentials".to_string())]
        );
    }
}
