//! Identity provider seam.
//!
//! Authentication is an external concern: the gateway only needs to turn
//! request headers into a [`Principal`] (or decide there is none). The
//! [`IdentityProvider`] trait is that seam; [`TokenIdentity`] is the
//! bundled implementation, mapping static bearer tokens or session cookie
//! values to role sets from the `[identity]` config table.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use vault::authz::Principal;
use vault::config::IdentityConfig;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "vaultgate_session";

/// Resolves request headers to an authenticated principal.
pub trait IdentityProvider: Send + Sync {
    /// The principal for this request, or `None` when unauthenticated.
    fn principal_for(&self, headers: &HeaderMap) -> Option<Principal>;

    /// Where unauthenticated requests are redirected.
    fn login_url(&self) -> &str;
}

/// Static token-to-roles provider backed by the `[identity]` config table.
pub struct TokenIdentity {
    tokens: HashMap<String, Vec<String>>,
    login_url: String,
}

impl TokenIdentity {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            tokens: config
                .tokens
                .iter()
                .map(|(token, roles)| (token.clone(), roles.clone()))
                .collect(),
            login_url: config.login_url.clone(),
        }
    }

    /// Token from `Authorization: Bearer <token>`, falling back to the
    /// session cookie.
    fn extract_token(headers: &HeaderMap) -> Option<String> {
        if let Some(value) = headers.get(header::AUTHORIZATION) {
            if let Ok(value) = value.to_str() {
                if let Some(token) = value.strip_prefix("Bearer ") {
                    return Some(token.trim().to_string());
                }
            }
        }
        cookie_value(headers, SESSION_COOKIE)
    }
}

impl IdentityProvider for TokenIdentity {
    fn principal_for(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = Self::extract_token(headers)?;
        let roles = self.tokens.get(&token)?;
        Some(Principal::new(roles.clone()))
    }

    fn login_url(&self) -> &str {
        &self.login_url
    }
}

/// Extract a named cookie from the `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key == name {
            return Some(value.to_string());
        }
    }
    None
}
