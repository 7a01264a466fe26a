//! Configuration management
//!
//! Settings come from `~/.vidopt/config.json` (if present) and are then
//! overridden by `VIDOPT_*` environment variables. Everything is read once at
//! startup; blank values count as missing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use crate::Result;
use crate::error::Error;

/// Environment variable that relocates the config directory
pub const HOME_ENV: &str = "VIDOPT_HOME";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Identity provider domain prefix (`{domain}.auth.{region}.{provider_host}`)
    #[serde(default)]
    pub cognito_domain: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// App client id registered with the identity provider
    #[serde(default)]
    pub user_pool_client_id: String,

    /// Informational only; never sent anywhere
    #[serde(default)]
    pub user_pool_id: String,

    /// Backend base URL, e.g. `https://abc.execute-api.us-east-1.amazonaws.com/prod`
    #[serde(default)]
    pub api_url: String,

    /// Origin the callback listener serves; `redirect_uri` and `logout_uri` derive from it
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_provider_host")]
    pub provider_host: String,

    #[serde(default)]
    pub sign_in_endpoint: SignInEndpoint,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

/// Which hosted page starts the sign-in
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignInEndpoint {
    /// `/oauth2/authorize`
    #[default]
    Authorize,
    /// Hosted UI `/login`
    Login,
}

impl SignInEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            SignInEndpoint::Authorize => "/oauth2/authorize",
            SignInEndpoint::Login => "/login",
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_provider_host() -> String {
    "amazoncognito.com".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string(), "email".to_string(), "profile".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cognito_domain: String::new(),
            region: default_region(),
            user_pool_client_id: String::new(),
            user_pool_id: String::new(),
            api_url: String::new(),
            origin: default_origin(),
            provider_host: default_provider_host(),
            sign_in_endpoint: SignInEndpoint::default(),
            scopes: default_scopes(),
        }
    }
}

/// Trimmed value, or `None` when blank
pub(crate) fn present(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() { None } else { Some(value) }
}

impl Config {
    /// Overlay `VIDOPT_*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay variables from an arbitrary lookup. Blank values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut String); 6] = [
            ("VIDOPT_COGNITO_DOMAIN", &mut self.cognito_domain),
            ("VIDOPT_REGION", &mut self.region),
            ("VIDOPT_USER_POOL_CLIENT_ID", &mut self.user_pool_client_id),
            ("VIDOPT_USER_POOL_ID", &mut self.user_pool_id),
            ("VIDOPT_API_ENDPOINT", &mut self.api_url),
            ("VIDOPT_ORIGIN", &mut self.origin),
        ];

        for (key, slot) in fields {
            if let Some(value) = lookup(key) {
                if let Some(value) = present(&value) {
                    *slot = value.to_string();
                }
            }
        }
    }

    /// Names of required settings that are missing, in a stable order
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if present(&self.cognito_domain).is_none() {
            missing.push("cognito_domain");
        }
        if present(&self.region).is_none() {
            missing.push("region");
        }
        if present(&self.user_pool_client_id).is_none() {
            missing.push("user_pool_client_id");
        }
        if present(&self.api_url).is_none() {
            missing.push("api_url");
        }
        missing
    }

    /// Validated backend base URL
    pub fn api_base(&self) -> Result<Url> {
        let raw = present(&self.api_url)
            .ok_or_else(|| Error::Config("api_url is not set (VIDOPT_API_ENDPOINT)".to_string()))?;
        let url = Url::parse(raw)
            .map_err(|e| Error::Config(format!("api_url {:?} is not a valid URL: {}", raw, e)))?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!("api_url {:?} cannot be used as a base URL", raw)));
        }
        Ok(url)
    }

    /// Validated application origin
    pub fn origin_url(&self) -> Result<Url> {
        let raw = present(&self.origin)
            .ok_or_else(|| Error::Config("origin is not set (VIDOPT_ORIGIN)".to_string()))?;
        parse_origin(raw)
    }
}

/// Parse an origin (`scheme://host[:port]`). Paths, queries and fragments are rejected.
pub fn parse_origin(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("origin {:?} is not a valid URL: {}", raw, e)))?;
    if url.host_str().is_none() || url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(Error::Config(format!("origin {:?} must be scheme://host[:port]", raw)));
    }
    Ok(url)
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vidopt")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the default file, then overlay the environment
pub fn load() -> Result<Config> {
    let mut config = load_from(&config_path())?;
    config.apply_env();
    tracing::debug!(missing = ?config.missing_keys(), "Configuration loaded");
    Ok(config)
}

/// Load configuration from a file; a missing file yields the defaults
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to the default file
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

/// Save configuration to a file
pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Interactive setup wizard
pub fn onboard() -> Result<()> {
    use crate::ui;
    use inquire::{Select, Text};

    ui::print_header("Setup Wizard");
    println!("  I'll ask for your identity provider and backend details.\n");

    let mut config = load_from(&config_path())?;

    config.cognito_domain = Text::new("Identity provider domain prefix:")
        .with_default(&config.cognito_domain)
        .prompt()?;
    config.region = Text::new("Region:")
        .with_default(&config.region)
        .prompt()?;
    config.user_pool_client_id = Text::new("App client id:")
        .with_default(&config.user_pool_client_id)
        .prompt()?;
    config.api_url = Text::new("Backend API URL:")
        .with_default(&config.api_url)
        .prompt()?;
    config.origin = Text::new("Callback origin (must match the registered redirect URI):")
        .with_default(&config.origin)
        .prompt()?;

    let endpoints = vec!["OAuth2 authorize endpoint", "Hosted login page"];
    let choice = Select::new("Sign-in page:", endpoints).prompt()?;
    config.sign_in_endpoint = if choice.starts_with("Hosted") {
        SignInEndpoint::Login
    } else {
        SignInEndpoint::Authorize
    };

    // Fail here rather than at the first sign-in
    config.origin_url()?;
    let missing = config.missing_keys();
    if !missing.is_empty() {
        return Err(Error::Config(format!("missing required settings: {}", missing.join(", "))));
    }

    ui::print_thinking("Saving configuration");
    save(&config)?;
    ui::print_success(&format!("Saved to {:?}", config_path()));
    ui::print_step(&format!(
        "Register {}/auth/callback as an allowed callback URL with your identity provider.",
        config.origin.trim_end_matches('/')
    ));

    Ok(())
}
