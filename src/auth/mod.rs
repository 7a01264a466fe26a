//! Authentication session lifecycle
//!
//! This module provides:
//! - Sign-in and sign-out URLs for the hosted identity provider
//! - The in-memory session store
//! - The callback route that completes a sign-in

mod callback_server;
mod redirect;
mod session;

pub use callback_server::{
    handle_callback, parse_callback_url, CallbackListener, CallbackParams, Destination,
    PendingCallback,
};
pub use redirect::{
    build_authorization_url, build_authorization_url_with_state, build_logout_url,
    generate_state, redirect_uri, AuthorizationRequest, IdentityProvider, SignIn, CALLBACK_PATH,
};
pub use session::SessionStore;
