//! # VaultGate Core Library
//!
//! This crate implements the access-control and delivery pipeline for a
//! private file vault: a directory tree outside the public web root whose
//! files may only be retrieved by principals holding the right roles.
//!
//! ## Overview
//!
//! Every download request flows through the same fixed pipeline:
//!
//! - **Sanitization**: strip traversal material from the raw query value
//! - **Validation**: enforce the two-segment `folder/file` grammar
//! - **Authorization**: match the principal's roles against the folder map
//! - **Resolution**: canonicalize and contain the path inside the root
//! - **Policy**: size limits, MIME labeling, response header set
//! - **Delivery**: direct read or chunked streaming of the file body
//!
//! ## Architecture
//!
//! ```text
//! raw query ──► sanitize ──► validate ──► authorize ──► resolve
//!                                │            │            │
//!                              (400)        (403)        (404)
//!                                                          │
//!                                          policy ◄────────┘
//!                                            │
//!                                     (413) ─┤
//!                                            ▼
//!                                 delivery: direct | chunked
//! ```
//!
//! Ordering is load-bearing: authorization runs before any filesystem
//! access, and every resolution failure collapses to "not found" so the
//! existence of unauthorized files is never disclosed.
//!
//! ## Modules
//!
//! - [`sanitize`]: raw request path sanitization
//! - [`validate`]: the `folder/file` grammar and [`VaultRelPath`]
//! - [`authz`]: role-to-folder authorization
//! - [`resolve`]: canonicalization and vault containment
//! - [`policy`]: size limits, MIME whitelist, security headers
//! - [`delivery`]: direct and chunked file bodies
//! - [`audit`]: access log with size-based rotation
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: the [`AccessError`] taxonomy

pub mod audit;
pub mod authz;
pub mod config;
pub mod delivery;
pub mod error;
pub mod policy;
pub mod resolve;
pub mod sanitize;
pub mod validate;

// Re-export the pipeline types for convenience
pub use audit::AuditLog;
pub use authz::{authorize, AuthzGrant, Principal, RoleFolderMap, ADMINISTRATOR_ROLE};
pub use config::{Config, ConfigError};
pub use delivery::{DeliveryBody, FileChunkStream};
pub use error::AccessError;
pub use policy::{DeliveryPlan, DeliveryPolicy, MimeWhitelist, CACHE_CONTROL, SECURITY_HEADERS};
pub use resolve::{ResolvedFile, VaultRoot};
pub use sanitize::sanitize_request_path;
pub use validate::VaultRelPath;
