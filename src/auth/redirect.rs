//! Sign-in and sign-out URLs for the hosted identity provider
//!
//! Pure construction only: nothing here touches the network or the session.
//! The caller decides how to navigate to the returned URL.

use url::Url;
use crate::Result;
use crate::config::{parse_origin, present, Config, SignInEndpoint};
use crate::error::Error;

/// Path the provider redirects back to, appended to the current origin
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Validated identity provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProvider {
    domain: String,
    region: String,
    provider_host: String,
    client_id: String,
    scopes: Vec<String>,
    sign_in_endpoint: SignInEndpoint,
}

impl IdentityProvider {
    /// Validate the provider settings of a [`Config`].
    ///
    /// Fails with [`Error::Config`] naming every missing key, so a URL with a
    /// blank segment is never produced.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut missing = Vec::new();
        let domain = present(&config.cognito_domain);
        let region = present(&config.region);
        let provider_host = present(&config.provider_host);
        let client_id = present(&config.user_pool_client_id);

        if domain.is_none() {
            missing.push("cognito_domain");
        }
        if region.is_none() {
            missing.push("region");
        }
        if provider_host.is_none() {
            missing.push("provider_host");
        }
        if client_id.is_none() {
            missing.push("user_pool_client_id");
        }

        match (domain, region, provider_host, client_id) {
            (Some(domain), Some(region), Some(provider_host), Some(client_id)) => Ok(Self {
                domain: domain.to_string(),
                region: region.to_string(),
                provider_host: provider_host.to_string(),
                client_id: client_id.to_string(),
                scopes: config.scopes.clone(),
                sign_in_endpoint: config.sign_in_endpoint,
            }),
            _ => Err(Error::Config(format!(
                "missing identity provider settings: {}",
                missing.join(", ")
            ))),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// `https://{domain}.auth.{region}.{provider_host}`
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("https://{}.auth.{}.{}", self.domain, self.region, self.provider_host);
        Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid provider URL {:?}: {}", raw, e)))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url()?;
        url.set_path(path);
        Ok(url)
    }
}

/// Parameters of one sign-in attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub response_type: &'static str,
    pub scope: String,
    pub redirect_uri: String,
    pub state: Option<String>,
}

impl AuthorizationRequest {
    /// Build the request for `origin`; `redirect_uri` is always `origin + /auth/callback`
    pub fn new(provider: &IdentityProvider, origin: &str, state: Option<String>) -> Result<Self> {
        Ok(Self {
            client_id: provider.client_id.clone(),
            response_type: "code",
            scope: provider.scopes.join(" "),
            redirect_uri: redirect_uri(origin)?,
            state,
        })
    }
}

/// Sign-in URL plus the state it carries
#[derive(Debug, Clone)]
pub struct SignIn {
    pub url: Url,
    pub state: Option<String>,
}

/// `origin` with the callback path appended
pub fn redirect_uri(origin: &str) -> Result<String> {
    Ok(format!("{}{}", normalized_origin(origin)?, CALLBACK_PATH))
}

/// Validated origin without a trailing slash
fn normalized_origin(origin: &str) -> Result<String> {
    let origin = present(origin)
        .ok_or_else(|| Error::Config("current origin is empty".to_string()))?;
    parse_origin(origin)?;
    Ok(origin.trim_end_matches('/').to_string())
}

/// Generate a fresh anti-replay state value
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build the provider authorization URL for `origin` with an explicit state.
pub fn build_authorization_url_with_state(
    config: &Config,
    origin: &str,
    state: Option<String>,
) -> Result<SignIn> {
    let provider = IdentityProvider::from_config(config)?;
    let request = AuthorizationRequest::new(&provider, origin, state)?;

    let mut url = provider.endpoint(provider.sign_in_endpoint.path())?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &request.client_id)
            .append_pair("response_type", request.response_type)
            .append_pair("scope", &request.scope)
            .append_pair("redirect_uri", &request.redirect_uri);
        if let Some(state) = &request.state {
            query.append_pair("state", state);
        }
    }

    tracing::debug!(redirect_uri = %request.redirect_uri, "Built authorization URL");

    Ok(SignIn { url, state: request.state })
}

/// Build the provider authorization URL for `origin` with a freshly generated state.
pub fn build_authorization_url(config: &Config, origin: &str) -> Result<SignIn> {
    build_authorization_url_with_state(config, origin, Some(generate_state()))
}

/// Build the provider logout URL; the provider sends the browser back to `origin`.
pub fn build_logout_url(config: &Config, origin: &str) -> Result<Url> {
    let provider = IdentityProvider::from_config(config)?;
    let logout_uri = normalized_origin(origin)?;

    let mut url = provider.endpoint("/logout")?;
    url.query_pairs_mut()
        .append_pair("client_id", &provider.client_id)
        .append_pair("logout_uri", &logout_uri)
        .append_pair("response_type", "code");

    Ok(url)
}
