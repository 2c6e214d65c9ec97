//! OAuth2 password-grant token exchange
//!
//! One POST to the token endpoint, authenticated with HTTP Basic using the
//! app's client id and secret. Reddit answers some credential failures
//! (wrong password, 2FA accounts) with `200 OK` and an `error` field instead
//! of an HTTP error, so the body is checked before it is trusted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Successful response from the token endpoint.
///
/// `expires_in` is a delta in seconds from the response time. Any other
/// fields (`token_type`, `scope`, ...) are kept in `extra` so they can be
/// written to the cache untouched.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Exchange the credential set for a bearer token.
pub async fn password_grant(
    client: &reqwest::Client,
    endpoint: &str,
    user_agent: &str,
    credentials: &Credentials,
) -> Result<TokenResponse> {
    let response = client
        .post(endpoint)
        .basic_auth(
            &credentials.client_id,
            Some(credentials.client_secret.expose()),
        )
        .header(reqwest::header::USER_AGENT, user_agent)
        .form(&[
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "token endpoint rejected client credentials ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| Error::TokenExchange(format!("token response is not JSON: {e}")))?;

    if let Some(reason) = body.get("error") {
        return Err(Error::InvalidCredentials(format!(
            "token endpoint returned error {reason}"
        )));
    }

    let token: TokenResponse = serde_json::from_value(body)
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;
    debug!(expires_in = token.expires_in, "password grant succeeded");
    Ok(token)
}
