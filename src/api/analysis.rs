//! Authorized analysis requests

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use crate::Result;
use crate::error::Error;
use super::{failure_details, ApiClient, ANALYZE_PATH};

/// Kind of analysis the backend should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    /// Title, description, chapters, tags and thumbnail keywords
    Seo,
    /// Blog post built from the transcript
    Blog,
}

impl AnalysisType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::Seo => "seo",
            AnalysisType::Blog => "blog",
        }
    }

    /// Progress line shown while the request is outstanding
    pub fn progress_label(self) -> &'static str {
        match self {
            AnalysisType::Seo => "Generating SEO metadata...",
            AnalysisType::Blog => "Generating blog post...",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "seo" => Ok(AnalysisType::Seo),
            "blog" => Ok(AnalysisType::Blog),
            other => Err(Error::InvalidInput(format!(
                "unknown analysis type {:?} (expected \"seo\" or \"blog\")",
                other
            ))),
        }
    }
}

/// Wire body of `POST /analyze`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest<'a> {
    transcript_key: &'a str,
    analysis_type: AnalysisType,
}

impl ApiClient {
    /// Submit a transcript for analysis on behalf of the signed-in user.
    ///
    /// Returns the backend's JSON body unchanged. A missing token is caught
    /// here and nothing goes over the wire.
    ///
    /// # Errors
    ///
    /// [`Error::Unauthenticated`] without a token,
    /// [`Error::InvalidInput`] for a blank transcript,
    /// [`Error::AnalysisFailed`] on a non-success status,
    /// [`Error::Transport`] when no response arrives.
    pub async fn submit_analysis(
        &self,
        transcript: &str,
        analysis_type: AnalysisType,
        token: Option<&str>,
    ) -> Result<Value> {
        let token = token.filter(|t| !t.is_empty()).ok_or(Error::Unauthenticated)?;

        if transcript.trim().is_empty() {
            return Err(Error::InvalidInput("transcript is empty".to_string()));
        }

        tracing::info!(%analysis_type, chars = transcript.len(), "Submitting analysis");

        let response = self
            .http
            .post(self.endpoint(ANALYZE_PATH))
            .bearer_auth(token)
            .json(&AnalysisRequest { transcript_key: transcript, analysis_type })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Analysis request failed: {}", e);
                Error::Transport(e)
            })?;

        if !response.status().is_success() {
            let (status, message) = failure_details(response).await;
            tracing::warn!(status, %message, "Analysis rejected");
            return Err(Error::AnalysisFailed { status, message });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analysis_type_parsing() {
        assert_eq!("seo".parse::<AnalysisType>().unwrap(), AnalysisType::Seo);
        assert_eq!("blog".parse::<AnalysisType>().unwrap(), AnalysisType::Blog);
        assert!(matches!("video".parse::<AnalysisType>(), Err(Error::InvalidInput(_))));
        assert!("".parse::<AnalysisType>().is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(AnalysisRequest {
            transcript_key: "hello",
            analysis_type: AnalysisType::Blog,
        })
        .unwrap();
        assert_eq!(body, json!({"transcriptKey": "hello", "analysisType": "blog"}));
    }

    #[test]
    fn test_progress_labels() {
        assert_eq!(AnalysisType::Seo.progress_label(), "Generating SEO metadata...");
        assert_eq!(AnalysisType::Blog.progress_label(), "Generating blog post...");
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_sending() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();

        let err = client.submit_analysis("hello", AnalysisType::Seo, None).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));

        let err = client.submit_analysis("hello", AnalysisType::Seo, Some("")).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }

    #[tokio::test]
    async fn test_blank_transcript_is_rejected() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .submit_analysis(" \n ", AnalysisType::Blog, Some("tok-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
