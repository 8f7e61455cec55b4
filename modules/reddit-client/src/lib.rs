pub mod error;
pub mod stream;
pub mod types;

pub use error::{RedditError, Result};
pub use stream::{ListingKind, SeenHistory, StreamEvent, StreamOptions, Subscription};
pub use types::{Comment, Credentials, Link, Listing, Me, Thing};

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use types::TokenResponse;

const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// Listing page size. Reddit caps this at 100.
const LISTING_LIMIT: u32 = 100;

/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Reddit OAuth client for a script app. Cheap to clone; clones share the
/// HTTP pool and the access token.
#[derive(Clone)]
pub struct RedditClient {
    client: reqwest::Client,
    credentials: Arc<Credentials>,
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl RedditClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            credentials: Arc::new(credentials),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Fetch an access token up front so bad credentials fail at startup.
    pub async fn login(&self) -> Result<()> {
        let fresh = self.fetch_token().await?;
        *self.token.write().await = Some(fresh);
        tracing::debug!(username = self.credentials.username.as_str(), "Reddit token acquired");
        Ok(())
    }

    /// The authenticated account.
    pub async fn me(&self) -> Result<Me> {
        self.get_json("/api/v1/me", &[]).await
    }

    /// Newest things from a subreddit listing, newest first.
    pub async fn listing(&self, subreddit: &str, kind: ListingKind) -> Result<Vec<Thing>> {
        let path = format!("/r/{}/{}", subreddit, kind.path());
        let limit = LISTING_LIMIT.to_string();
        let query = [("limit", limit.as_str()), ("raw_json", "1")];

        let things = match kind {
            ListingKind::Posts => self
                .get_json::<Listing<Link>>(&path, &query)
                .await?
                .into_items()
                .into_iter()
                .map(Thing::Link)
                .collect(),
            ListingKind::Comments => self
                .get_json::<Listing<Comment>>(&path, &query)
                .await?
                .into_items()
                .into_iter()
                .map(Thing::Comment)
                .collect(),
        };
        Ok(things)
    }

    /// Remove a post or comment as a moderator. `spam = true` also trains
    /// the spam filter against the author; removal is idempotent either way.
    pub async fn remove(&self, fullname: &str, spam: bool) -> Result<()> {
        let token = self.bearer().await?;
        let url = format!("{}/api/remove", OAUTH_BASE);
        let spam = if spam { "true" } else { "false" };
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .form(&[("id", fullname), ("spam", spam)])
            .send()
            .await?;

        check_status(resp).await?;
        tracing::debug!(fullname, spam, "Removed thing");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let token = self.bearer().await?;
        let url = format!("{}{}", OAUTH_BASE, path);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Current access token, refreshing it when it is about to expire.
    async fn bearer(&self) -> Result<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *self.token.write().await = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let creds = &self.credentials;
        let resp = self
            .client
            .post(AUTH_URL)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = resp.text().await.unwrap_or_default();
            return Err(RedditError::Auth(format!("token endpoint returned {status}: {body}")));
        }
        let resp = check_status(resp).await?;
        let token: TokenResponse = serde_json::from_str(&resp.text().await?)?;

        if let Some(error) = token.error {
            return Err(RedditError::Auth(error));
        }
        let value = token
            .access_token
            .ok_or_else(|| RedditError::Auth("no access_token in response".to_string()))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));

        Ok(AccessToken {
            value,
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        })
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RedditError::Api {
        status: status.as_u16(),
        message: body,
    })
}
