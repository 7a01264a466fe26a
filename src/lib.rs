//! vidopt - terminal client for the video transcript analysis service
//!
//! This library provides the signed-in session lifecycle against a hosted
//! identity provider (Authorization Code redirect flow) and the authorized
//! client for the backend analysis API.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};
