//! Permission vocabulary and the permission evaluator.
//!
//! Permissions are a closed set of capability strings. Grants are unordered sets,
//! and a grant satisfies a requirement when the requirement is a subset of it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single capability that can be granted to a session or an API key.
///
/// The wire form (`create:recipe`, `create:apiKey`, ...) is what appears in
/// tokens, database rows and request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "create:recipe")]
    CreateRecipe,
    #[serde(rename = "create:apiKey")]
    CreateApiKey,
    #[serde(rename = "read:recipe")]
    ReadRecipe,
    #[serde(rename = "update:recipe")]
    UpdateRecipe,
    #[serde(rename = "delete:recipe")]
    DeleteRecipe,
}

/// A validated set of permissions.
pub type PermissionSet = BTreeSet<Permission>;

impl Permission {
    /// Every permission in the vocabulary.
    pub const ALL: [Permission; 5] = [
        Permission::CreateRecipe,
        Permission::CreateApiKey,
        Permission::ReadRecipe,
        Permission::UpdateRecipe,
        Permission::DeleteRecipe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateRecipe => "create:recipe",
            Permission::CreateApiKey => "create:apiKey",
            Permission::ReadRecipe => "read:recipe",
            Permission::UpdateRecipe => "update:recipe",
            Permission::DeleteRecipe => "delete:recipe",
        }
    }

    /// The grant attached to a freshly logged-in session.
    pub fn session_grant() -> PermissionSet {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not part of the permission vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Parse loosely-typed permission strings into a validated set.
///
/// Every unknown string is reported, not just the first one.
pub fn parse_permissions<S: AsRef<str>>(raw: &[S]) -> Result<PermissionSet, Vec<String>> {
    let mut set = PermissionSet::new();
    let mut unknown = Vec::new();

    for value in raw {
        match value.as_ref().parse::<Permission>() {
            Ok(permission) => {
                set.insert(permission);
            }
            Err(UnknownPermission(name)) => unknown.push(name),
        }
    }

    if unknown.is_empty() { Ok(set) } else { Err(unknown) }
}

/// `true` iff every permission in `required` is also in `granted`.
pub fn satisfies(granted: &PermissionSet, required: &PermissionSet) -> bool {
    required.is_subset(granted)
}
