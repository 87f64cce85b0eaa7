/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Administrative privilege tiers, lowest first.
///
/// Gates compare tiers with `>=`, so a new tier slots in by adding a variant in
/// rank order and wrapping the credential verifier with a gate for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Map a stored `users.role` value to an administrative tier.
    /// Non-administrative roles (e.g. `user`) yield `None`.
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "super_admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    /// Stored role values that count as administrators for notification fan-out
    pub const ADMIN_VALUES: &'static [&'static str] = &["admin", "super_admin"];
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, resolved from storage on every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: i64,
    pub is_admin: bool,
    pub role: Role,
}

impl Principal {
    pub fn new(id: i64, role: Role) -> Self {
        Self {
            id,
            is_admin: true,
            role,
        }
    }

    pub fn has_at_least(&self, minimum: Role) -> bool {
        self.role >= minimum
    }
}
