//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session` / `SessionStore`: the current token pair and its shared holder
//! - `CredentialAuthenticator`: username/password login and logout
//! - `TokenRefresher`: access-token freshness checks with single-flight refresh
//! - `SessionSeal`: encrypted transport form of a session
//! - `CredentialStore`: secure OS-level credential storage via keyring

pub mod authenticator;
pub mod credentials;
pub mod refresher;
pub mod seal;
pub mod session;

pub use authenticator::CredentialAuthenticator;
pub use credentials::CredentialStore;
pub use refresher::TokenRefresher;
pub use seal::{SealError, SessionSeal};
pub use session::{Session, SessionError, SessionStore, Token, TokenState};
