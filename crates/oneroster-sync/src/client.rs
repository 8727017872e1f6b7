//! HTTP client for OneRoster 1.1 REST APIs with OAuth 2.0 client
//! credentials authentication.
//!
//! Tokens are cached per (base_url, client_id) with a TTL derived from the
//! provider's stated expiry minus a safety margin. A 401 triggers exactly one
//! re-authentication and one retry; a second 401 is fatal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use slate_core::error::{Result, SlateError};
use slate_core::http::validate_base_url;

use crate::api::{
    AcademicSessionResource, ClassResource, EnrollmentResource, OrgResource, UserResource,
};

const PAGE_LIMIT: u64 = 100;
const TOKEN_SAFETY_MARGIN_SECS: u64 = 60;
const MIN_TOKEN_TTL_SECS: u64 = 60;
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// OAuth token response from a OneRoster-compliant SIS.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Process-wide bearer token cache, keyed by a hash of (base_url, client_id)
/// so clients built for the same config share one token.
#[derive(Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().expect("token cache poisoned");
        entries
            .get(key)
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.token.clone())
    }

    fn put(&self, key: &str, token: String, ttl: Duration) {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        entries.insert(
            key.to_string(),
            CachedToken {
                token,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

fn cache_key(base_url: &str, client_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_url.as_bytes());
    hasher.update(b"|");
    hasher.update(client_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Shared HTTP client for OneRoster 1.1 APIs.
pub struct OneRosterClient {
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
    cache: Arc<TokenCache>,
    cache_key: String,
}

impl OneRosterClient {
    /// Build a client, validating the base URL against the internal-address
    /// denylist before any request can be issued.
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self> {
        Self::with_options(base_url, client_id, client_secret, false)
    }

    /// As [`OneRosterClient::new`], optionally permitting private hosts.
    /// Only tests running against a local mock server should pass `true`.
    pub fn with_options(
        base_url: &str,
        client_id: &str,
        client_secret: &str,
        allow_private_hosts: bool,
    ) -> Result<Self> {
        let url = validate_base_url(base_url, allow_private_hosts)?;
        let base_url = base_url.trim_end_matches('/').to_string();
        // The token exchange lives at the host root, not under the
        // OneRoster base path.
        let token_url = format!("{}/token", url.origin().ascii_serialization());
        Ok(Self {
            cache_key: cache_key(&base_url, client_id),
            base_url,
            token_url,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            http: reqwest::Client::new(),
            cache: Arc::new(TokenCache::new()),
        })
    }

    /// Share a token cache across clients (one per worker process).
    pub fn with_token_cache(mut self, cache: Arc<TokenCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Authenticate with the client-credentials grant and cache the token.
    pub async fn authenticate(&self) -> Result<String> {
        debug!(url = %self.token_url, "authenticating with OneRoster API");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "OneRoster authentication failed");
            return Err(SlateError::Auth(format!(
                "OneRoster authentication failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| SlateError::Auth(format!("failed to parse token response: {e}")))?;

        let expires_in = token_response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let ttl = expires_in
            .saturating_sub(TOKEN_SAFETY_MARGIN_SECS)
            .max(MIN_TOKEN_TTL_SECS);
        self.cache.put(
            &self.cache_key,
            token_response.access_token.clone(),
            Duration::from_secs(ttl),
        );
        debug!("OneRoster authentication successful");
        Ok(token_response.access_token)
    }

    async fn access_token(&self) -> Result<String> {
        match self.cache.get(&self.cache_key) {
            Some(token) => Ok(token),
            None => self.authenticate().await,
        }
    }

    /// GET with bearer auth; re-authenticates and retries exactly once on a
    /// 401, and treats a second 401 as a fatal credential error.
    async fn authenticated_get(&self, url: &str) -> Result<reqwest::Response> {
        let token = self.access_token().await?;
        let response = self.http.get(url).bearer_auth(&token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(url, "401 from OneRoster API, re-authenticating once");
            let token = self.authenticate().await?;
            let retry = self.http.get(url).bearer_auth(&token).send().await?;
            if retry.status() == StatusCode::UNAUTHORIZED {
                return Err(SlateError::Auth(
                    "OneRoster API rejected credentials after re-authentication".into(),
                ));
            }
            return Self::check_success(retry).await;
        }

        Self::check_success(response).await
    }

    async fn check_success(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlateError::Provider(format!(
                "OneRoster API request failed with status {status}: {body}"
            )));
        }
        Ok(response)
    }

    /// Fetch every page of a paginated endpoint into one collection.
    ///
    /// Follows the `Link: rel="next"` header when the provider sends one,
    /// falling back to offset arithmetic otherwise.
    pub async fn get_all<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        wrapper_key: &str,
    ) -> Result<Vec<T>> {
        let mut results: Vec<T> = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let url = format!(
                "{}{endpoint}?limit={PAGE_LIMIT}&offset={offset}",
                self.base_url
            );
            debug!(url = %url, "fetching page");
            let response = self.authenticated_get(&url).await?;
            let next_link = next_link(response.headers());

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| SlateError::Provider(format!("failed to parse API response: {e}")))?;
            let page = body
                .get(wrapper_key)
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            let page_count = page.len() as u64;

            for element in page {
                let record: T = serde_json::from_value(element).map_err(|e| {
                    SlateError::Serialization(format!(
                        "failed to deserialize {endpoint} record: {e}"
                    ))
                })?;
                results.push(record);
            }

            if page_count == 0 {
                break;
            }

            match next_link {
                Some(next_url) => {
                    offset = offset_from_url(&next_url).unwrap_or(offset + PAGE_LIMIT);
                }
                None => {
                    if page_count < PAGE_LIMIT {
                        break;
                    }
                    offset += PAGE_LIMIT;
                }
            }
        }

        Ok(results)
    }

    pub async fn get_all_orgs(&self) -> Result<Vec<OrgResource>> {
        self.get_all("/orgs", "orgs").await
    }

    pub async fn get_all_academic_sessions(&self) -> Result<Vec<AcademicSessionResource>> {
        self.get_all("/academicSessions", "academicSessions").await
    }

    pub async fn get_all_users(&self) -> Result<Vec<UserResource>> {
        self.get_all("/users", "users").await
    }

    pub async fn get_all_classes(&self) -> Result<Vec<ClassResource>> {
        self.get_all("/classes", "classes").await
    }

    pub async fn get_all_enrollments(&self) -> Result<Vec<EnrollmentResource>> {
        self.get_all("/enrollments", "enrollments").await
    }

    /// Authenticate and fetch one org to validate credentials and base URL.
    pub async fn test_connection(&self) -> Result<()> {
        self.authenticate().await?;
        let url = format!("{}/orgs?limit=1&offset=0", self.base_url);
        self.authenticated_get(&url).await?;
        Ok(())
    }
}

/// Extract the rel="next" target from a Link header, if present.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get("link")?.to_str().ok()?;
    for part in link.split(',') {
        let part = part.trim();
        if !part.contains("rel=\"next\"") {
            continue;
        }
        let start = part.find('<')?;
        let end = part.find('>')?;
        if start + 1 < end {
            return Some(part[start + 1..end].to_string());
        }
    }
    None
}

fn offset_from_url(url: &str) -> Option<u64> {
    let query = url.split_once('?')?.1;
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("offset=") {
            return value.parse().ok();
        }
    }
    None
}
