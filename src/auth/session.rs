//! In-memory session custody
//!
//! The token lives only as long as the owning value. There is exactly one
//! writer path (sign-in success and sign-out); everything else reads.

use std::fmt;

/// The current identity token, if signed in
#[derive(Default)]
pub struct SessionStore {
    token: Option<String>,
}

impl SessionStore {
    /// Start unauthenticated
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Replace the token after a successful exchange
    pub fn set_token(&mut self, token: impl Into<String>) {
        if self.token.is_some() {
            tracing::debug!("Replacing existing session token");
        }
        self.token = Some(token.into());
        tracing::info!("Session established");
    }

    /// Drop the token. Safe to call when already signed out.
    pub fn clear(&mut self) {
        if self.token.take().is_some() {
            tracing::info!("Session cleared");
        }
    }
}

// Keep the token out of logs and panics
impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
