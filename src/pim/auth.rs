//! OAuth access tokens for the Akeneo API.
//!
//! The API uses the password grant: client id/secret as HTTP basic auth,
//! user credentials in the body. Tokens are kept until shortly before they
//! expire and then requested again.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::Result;

/// Refresh this long before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds. Missing means "until rejected".
    #[serde(default)]
    pub expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn from_response(response: TokenResponse, now: Instant) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| now + Duration::from_secs(secs).saturating_sub(EXPIRY_MARGIN));
        Self {
            value: response.access_token,
            expires_at,
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Shared holder for the current access token.
#[derive(Default)]
pub(crate) struct TokenCache {
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Return a fresh token, calling `fetch` when none is held or it expired.
    ///
    /// Concurrent callers wait on the same fetch.
    pub async fn bearer<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenResponse>>,
    {
        let mut current = self.current.lock().await;
        let now = Instant::now();
        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        debug!("requesting PIM access token");
        let token = CachedToken::from_response(fetch().await?, Instant::now());
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }
}
