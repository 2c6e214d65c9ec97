//! Cached bearer-token provider
//!
//! Hands out the cached token while it is still valid and falls back to a
//! fresh password grant otherwise. A cache file that cannot be read is
//! logged and treated as a miss; the next successful exchange replaces it.

use tracing::{debug, error, info, warn};

use crate::cache::{CachedToken, TokenCache, now_millis};
use crate::credentials::Credentials;
use crate::error::Result;
use crate::token::password_grant;

pub struct TokenProvider {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
    credentials: Credentials,
    cache: TokenCache,
}

impl TokenProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        user_agent: impl Into<String>,
        credentials: Credentials,
        cache: TokenCache,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
            credentials,
            cache,
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Return a bearer token that is valid right now.
    ///
    /// Makes no network call when the cached token has not expired. Otherwise
    /// performs one password grant and overwrites the cache with the result.
    pub async fn get_token(&self) -> Result<String> {
        let now = now_millis();

        match self.cache.load().await {
            Ok(Some(cached)) if cached.is_valid_at(now) => {
                debug!(expires = cached.expires, "using cached access token");
                return Ok(cached.access_token);
            }
            Ok(Some(cached)) => debug!(expired_at = cached.expires, "cached access token expired"),
            Ok(None) => debug!(path = %self.cache.path().display(), "no cached access token"),
            Err(e) => warn!(
                path = %self.cache.path().display(),
                error = %e,
                "ignoring unreadable token cache"
            ),
        }

        let response = password_grant(
            &self.client,
            &self.endpoint,
            &self.user_agent,
            &self.credentials,
        )
        .await
        .inspect_err(|e| error!(error = %e, "unable to get auth token"))?;

        let token = CachedToken::from_response(response, now);
        self.cache
            .store(&token)
            .await
            .inspect_err(|e| error!(error = %e, "unable to persist auth token"))?;

        info!(expires = token.expires, "obtained new access token");
        Ok(token.access_token)
    }
}
