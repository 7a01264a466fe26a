//! Backend API client
//!
//! One cookie-bearing HTTP client shared by the token exchange and the
//! analysis calls. Neither call retries; every failure goes back to the caller
//! as a typed [`Error`](crate::Error).

mod analysis;
mod token;

pub use analysis::AnalysisType;
pub use token::TokenResponse;

use reqwest::{Client, Response};
use serde_json::Value;
use crate::Result;
use crate::config::Config;

/// Token exchange endpoint, relative to the API base URL
pub const TOKEN_PATH: &str = "/auth/token";

/// Analysis endpoint, relative to the API base URL
pub const ANALYZE_PATH: &str = "/analyze";

/// Client for the analysis backend
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (may include a stage path such as `/prod`).
    ///
    /// The HTTP client keeps a cookie store so provider-side session cookies
    /// travel with both calls.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Create a client from validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let base = config.api_base()?;
        Self::new(base.as_str())
    }

    /// Use a custom HTTP client
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Status and server-supplied message of a non-success response.
///
/// The message is the JSON body's `message`, then its `error`, then the
/// status reason phrase.
async fn failure_details(response: Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = message_from_body(&body).unwrap_or_else(|| {
        status.canonical_reason().unwrap_or("Unknown error").to_string()
    });
    (status.as_u16(), message)
}

fn message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_stage_path() {
        let client = ApiClient::new("https://api.example.com/prod/").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/prod");
        assert_eq!(client.endpoint(TOKEN_PATH), "https://api.example.com/prod/auth/token");
        assert_eq!(client.endpoint(ANALYZE_PATH), "https://api.example.com/prod/analyze");
    }

    #[test]
    fn test_from_config_requires_api_url() {
        let err = ApiClient::from_config(&Config::default()).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_message_from_body() {
        assert_eq!(message_from_body(r#"{"message":"bad code"}"#).as_deref(), Some("bad code"));
        assert_eq!(message_from_body(r#"{"error":"invalid_grant"}"#).as_deref(), Some("invalid_grant"));
        assert_eq!(
            message_from_body(r#"{"message":"first","error":"second"}"#).as_deref(),
            Some("first")
        );
        assert_eq!(message_from_body(r#"{"message":""}"#), None);
        assert_eq!(message_from_body("<html>oops</html>"), None);
        assert_eq!(message_from_body(""), None);
    }
}
