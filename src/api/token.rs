//! Authorization code exchange

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::Result;
use crate::error::Error;
use super::{failure_details, ApiClient, TOKEN_PATH};

/// Tokens issued by the backend token endpoint
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Identity token attached to analysis calls
    #[serde(alias = "identityToken", alias = "idToken")]
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("id_token", &"<redacted>")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    code: &'a str,
}

impl ApiClient {
    /// Exchange an authorization code for tokens.
    ///
    /// One round trip, no retry. The session is left untouched; storing the
    /// token is the caller's job.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty code (nothing is sent),
    /// [`Error::ExchangeFailed`] on a non-success status,
    /// [`Error::Transport`] when no response arrives,
    /// [`Error::Json`] when a success body carries no identity token.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<TokenResponse> {
        if code.trim().is_empty() {
            return Err(Error::InvalidInput("authorization code is empty".to_string()));
        }

        tracing::info!("Exchanging authorization code for token");

        let response = self
            .http
            .post(self.endpoint(TOKEN_PATH))
            .json(&TokenExchangeRequest { code })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Token exchange request failed: {}", e);
                Error::Transport(e)
            })?;

        if !response.status().is_success() {
            let (status, message) = failure_details(response).await;
            tracing::warn!(status, %message, "Token exchange rejected");
            return Err(Error::ExchangeFailed { status, message });
        }

        let body = response.text().await?;
        let tokens: TokenResponse = serde_json::from_str(&body)?;
        tracing::debug!(?tokens, "Token exchange succeeded");
        Ok(tokens)
    }
}
