//! Core library for fintrack.
//!
//! Holds a user's session credentials, refreshes them when they go stale,
//! and forwards resource requests to the finance backend with a valid bearer
//! token. Front ends (the CLI, a browser-facing server) drive it through
//! `CredentialAuthenticator::login` and `AuthGateway::proxy`.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, AuthGateway, BackendClient, GatewayReply, RequestOptions};
pub use auth::{
    CredentialAuthenticator, CredentialStore, Session, SessionSeal, SessionStore, TokenRefresher,
    TokenState,
};
pub use config::Config;
