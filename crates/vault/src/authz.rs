//! Role-to-folder authorization.
//!
//! A pure decision over immutable inputs: the principal's roles, the
//! validated path, and the configured role-to-folder map. No filesystem
//! access happens here; resolution only runs for authorized paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::validate::VaultRelPath;

/// Role granting access to every path in the vault.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// An authenticated identity, as produced by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Roles in provider order. Order matters: the first role that
    /// authorizes the path wins.
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(roles: Vec<String>) -> Self {
        Self { roles }
    }
}

/// Role name mapped to the single top-level vault folder it may read.
///
/// A `BTreeMap` keeps serialized config output deterministic.
pub type RoleFolderMap = BTreeMap<String, String>;

/// The default role map: `subscriber` and `contributor` tiers.
pub fn default_role_folders() -> RoleFolderMap {
    let mut map = RoleFolderMap::new();
    map.insert("subscriber".to_string(), "group-1".to_string());
    map.insert("contributor".to_string(), "group-2".to_string());
    map
}

/// Which rule authorized the request. Recorded in the audit log only;
/// never disclosed to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzGrant {
    /// The principal holds the administrator role.
    Administrator,
    /// A mapped role's folder matched the path's folder segment.
    FolderMatch { role: String, folder: String },
}

/// Decide whether any of the principal's roles authorizes the path.
///
/// Roles are checked in order. For each role: the administrator wildcard
/// grants everything; otherwise the role's mapped folder must equal the
/// path's folder segment. Roles absent from the map are skipped. The
/// comparison is segment-exact, so a mapping to `group-1` never authorizes
/// `group-10/...`.
pub fn authorize(
    roles: &[String],
    path: &VaultRelPath,
    map: &RoleFolderMap,
) -> Result<AuthzGrant, AccessError> {
    for role in roles {
        if role == ADMINISTRATOR_ROLE {
            tracing::debug!(%role, path = %path, "authorized via administrator role");
            return Ok(AuthzGrant::Administrator);
        }

        let Some(folder) = map.get(role) else {
            continue;
        };

        // Tolerate a trailing slash in configured folder values; the
        // comparison is segment-exact either way.
        if path.folder() == folder.trim_end_matches('/') {
            tracing::debug!(%role, %folder, path = %path, "authorized via folder mapping");
            return Ok(AuthzGrant::FolderMatch {
                role: role.clone(),
                folder: folder.clone(),
            });
        }
    }

    tracing::debug!(?roles, path = %path, "no role authorizes path");
    Err(AccessError::Forbidden)
}
