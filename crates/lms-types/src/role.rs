//! Access roles and the role-directory document format.
//!
//! The directory stores roles as untyped strings. [`Role::decode`] is the only
//! way to turn one back into a [`Role`], and it reports unrecognized values as
//! [`RoleDecode::Unknown`] instead of falling through to a default.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Access level of a signed-in person.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Librarian,
    /// Library member. Also the fallback whenever no role has been resolved.
    #[default]
    User,
}

/// Result of decoding a raw role string from the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleDecode {
    Known(Role),
    Unknown(String),
}

impl Role {
    /// Strictly decode a stored role string.
    ///
    /// Matching is exact: `"Admin"` or `" admin"` are unknown, the same as the
    /// directory's own rules.
    pub fn decode(raw: &str) -> RoleDecode {
        match raw.parse::<Role>() {
            Ok(role) => RoleDecode::Known(role),
            Err(_) => RoleDecode::Unknown(raw.to_string()),
        }
    }

    /// Wire form, as stored in role documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::User => "user",
        }
    }
}

/// Typed role record written by sign-up: `{ role, email, createdAt }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    pub role: Role,
    pub email: String,
    /// Unix millis.
    pub created_at: u64,
}

impl RoleRecord {
    pub fn new(role: Role, email: impl Into<String>) -> Self {
        Self {
            role,
            email: email.into(),
            created_at: crate::now_millis(),
        }
    }
}

/// Role document as read back from the directory.
///
/// Fields other than `role` are optional because the directory is shared with
/// other writers and older records may lack them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDocument {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

impl RoleDocument {
    pub fn decode_role(&self) -> RoleDecode {
        Role::decode(&self.role)
    }
}

impl From<&RoleRecord> for RoleDocument {
    fn from(record: &RoleRecord) -> Self {
        Self {
            role: record.role.as_str().to_string(),
            email: Some(record.email.clone()),
            created_at: Some(record.created_at),
        }
    }
}
