//! # VaultGate Gateway
//!
//! HTTP surface over the [`vault`] pipeline: an axum server exposing
//! `GET /download?file=<folder/file>` plus a liveness probe, with a
//! pluggable identity provider deciding who the requester is.
//!
//! ## Modules
//!
//! - [`identity`]: the [`IdentityProvider`] seam and the bundled
//!   token-based implementation
//! - [`server`]: router, state, the download handler, and error mapping

pub mod identity;
pub mod server;

pub use identity::{IdentityProvider, TokenIdentity, SESSION_COOKIE};
pub use server::{build_router, GatewayState, SharedState};
