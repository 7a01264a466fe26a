//! Session orchestration
//!
//! Drives the two disjoint phases of a sign-in: "initiate" builds the
//! provider URL and navigates to it, "resume" handles the callback URL and
//! owns the single code exchange. Sign-out clears the session before any
//! navigation happens.

use serde_json::Value;
use url::Url;
use crate::Result;
use crate::api::{AnalysisType, ApiClient};
use crate::auth::{
    build_authorization_url, build_logout_url, handle_callback, CallbackListener, Destination,
    IdentityProvider, SessionStore, SignIn,
};
use crate::config::Config;

/// Side effect of sending the user somewhere
pub trait Navigator {
    fn navigate(&mut self, url: &Url) -> Result<()>;
}

/// Opens URLs in the system browser, always printing them as a fallback
#[derive(Debug, Default, Clone)]
pub struct BrowserNavigator {
    /// Only print the URL
    pub print_only: bool,
}

impl BrowserNavigator {
    pub fn new(print_only: bool) -> Self {
        Self { print_only }
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&mut self, url: &Url) -> Result<()> {
        if self.print_only {
            println!("\nOpen this URL in your browser:\n{}\n", url);
            return Ok(());
        }

        println!("\nIf the browser doesn't open, visit this URL:\n{}\n", url);
        if let Err(e) = open::that(url.as_str()) {
            tracing::warn!("Failed to open browser: {}", e);
        }
        Ok(())
    }
}

/// A signed-in (or not yet signed-in) user of the analysis service
pub struct App<N: Navigator> {
    config: Config,
    api: ApiClient,
    session: SessionStore,
    navigator: N,
}

impl<N: Navigator> App<N> {
    /// Validate configuration up front; a broken config never reaches the network.
    pub fn new(config: Config, navigator: N) -> Result<Self> {
        IdentityProvider::from_config(&config)?;
        config.origin_url()?;
        let api = ApiClient::from_config(&config)?;

        Ok(Self {
            config,
            api,
            session: SessionStore::new(),
            navigator,
        })
    }

    /// Use a custom API client
    pub fn with_api(mut self, api: ApiClient) -> Self {
        self.api = api;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Initiate: build the authorization URL and navigate to it.
    ///
    /// Returns the attempt so the caller can check `state` on resume.
    pub fn begin_sign_in(&mut self) -> Result<SignIn> {
        let sign_in = build_authorization_url(&self.config, &self.config.origin)?;
        tracing::info!("Redirecting to identity provider");
        self.navigator.navigate(&sign_in.url)?;
        Ok(sign_in)
    }

    /// Resume: complete the sign-in from the callback URL.
    pub async fn complete_sign_in(
        &mut self,
        callback: &str,
        expected_state: Option<&str>,
    ) -> Result<Destination> {
        handle_callback(callback, expected_state, &self.api, &mut self.session).await
    }

    /// Full browser round trip: listen on the origin, navigate to the
    /// provider, then handle the first callback request.
    pub async fn sign_in_with_browser(&mut self) -> Result<Destination> {
        let origin = self.config.origin_url()?;
        let listener = CallbackListener::bind(&origin).await?;

        let sign_in = self.begin_sign_in()?;
        let pending = listener.accept().await?;

        let result = self
            .complete_sign_in(pending.target(), sign_in.state.as_deref())
            .await;
        pending.respond(&result).await;
        result
    }

    /// Run an analysis with the current session token.
    ///
    /// A failure here never touches the session, whatever the status.
    pub async fn analyze(&self, transcript: &str, analysis_type: AnalysisType) -> Result<Value> {
        self.api
            .submit_analysis(transcript, analysis_type, self.session.token())
            .await
    }

    /// Sign out: clear the session, then navigate to the provider logout page.
    ///
    /// The session is already cleared if building the URL or navigating fails.
    pub fn sign_out(&mut self) -> Result<Url> {
        self.session.clear();
        let url = build_logout_url(&self.config, &self.config.origin)?;
        tracing::info!("Redirecting to identity provider logout");
        self.navigator.navigate(&url)?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Recorder {
        visited: Vec<Url>,
    }

    impl Navigator for Recorder {
        fn navigate(&mut self, url: &Url) -> Result<()> {
            self.visited.push(url.clone());
            Ok(())
        }
    }

    fn test_config() -> Config {
        Config {
            cognito_domain: "my-app".to_string(),
            user_pool_client_id: "client-1".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_new_rejects_incomplete_config() {
        let config = Config { cognito_domain: String::new(), ..test_config() };
        assert!(matches!(App::new(config, Recorder::default()), Err(Error::Config(_))));

        let config = Config { api_url: String::new(), ..test_config() };
        assert!(matches!(App::new(config, Recorder::default()), Err(Error::Config(_))));
    }

    #[test]
    fn test_begin_sign_in_navigates() {
        let mut app = App::new(test_config(), Recorder::default()).unwrap();
        let sign_in = app.begin_sign_in().unwrap();

        assert_eq!(app.navigator().visited, vec![sign_in.url.clone()]);
        assert!(sign_in.url.as_str().contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
        assert!(!app.is_authenticated());
    }

    #[test]
    fn test_sign_out_when_signed_out() {
        let mut app = App::new(test_config(), Recorder::default()).unwrap();
        let url = app.sign_out().unwrap();
        assert_eq!(url.path(), "/logout");
        assert!(!app.is_authenticated());
    }

    #[tokio::test]
    async fn test_analyze_without_session() {
        let app = App::new(test_config(), Recorder::default()).unwrap();
        let err = app.analyze("hello", AnalysisType::Seo).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }
}
