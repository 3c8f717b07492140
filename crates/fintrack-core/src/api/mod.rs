//! Backend access for the finance tracker.
//!
//! This module provides the `AuthGateway` that forwards resource requests
//! with a valid bearer token, the shared `BackendClient`, the `ApiError`
//! taxonomy and the normalized `GatewayReply` shape.
//!
//! The backend issues short-lived access tokens and longer-lived refresh
//! tokens through its `/auth/*` endpoints.

pub mod client;
pub mod error;
pub mod gateway;
pub mod reply;
pub mod resources;

pub use client::BackendClient;
pub use error::ApiError;
pub use gateway::{AuthGateway, RequestOptions};
pub use reply::{GatewayReply, ReplyError};
