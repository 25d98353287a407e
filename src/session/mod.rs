//! Session data model. A session is the access/refresh token pair plus the
//! signed-in user's profile. Tokens are held as secrets and are never logged;
//! whether the session is authenticated is derived from its fields so it can
//! never drift from them.

pub mod store;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub use store::{CredentialStorage, CredentialStore, FileStorage, MemoryStorage, PersistedCredentials};

#[derive(Clone, Debug, Default)]
pub struct Session {
    access_token: SecretString,
    refresh_token: SecretString,
    user: Option<UserRecord>,
}

impl Session {
    #[must_use]
    pub fn new(user: UserRecord, access_token: SecretString, refresh_token: SecretString) -> Self {
        Self {
            access_token,
            refresh_token,
            user: Some(user),
        }
    }

    /// True iff both tokens are non-empty and a user record is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.expose_secret().is_empty()
            && !self.refresh_token.expose_secret().is_empty()
            && self.user.is_some()
    }

    /// True when no field carries any value, i.e. the session was never set or
    /// has been cleared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.expose_secret().is_empty()
            && self.refresh_token.expose_secret().is_empty()
            && self.user.is_none()
    }

    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }
}

/// Profile of the signed-in user. Replaced wholesale on every profile fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "name", alias = "full_name")]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub organizations: Vec<OrganizationMembership>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembership {
    #[serde(alias = "organization", deserialize_with = "string_or_number")]
    pub organization_id: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    pub status: MembershipStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Member,
    Manager,
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ADMIN" => Self::Admin,
            "MEMBER" => Self::Member,
            "MANAGER" => Self::Manager,
            _ => Self::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Member => write!(f, "MEMBER"),
            Self::Manager => write!(f, "MANAGER"),
            Self::Other(role) => write!(f, "{role}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Pending,
    Other(String),
}

impl From<String> for MembershipStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "INACTIVE" => Self::Inactive,
            "PENDING" => Self::Pending,
            _ => Self::Other(value),
        }
    }
}

impl From<MembershipStatus> for String {
    fn from(status: MembershipStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Pending => write!(f, "PENDING"),
            Self::Other(status) => write!(f, "{status}"),
        }
    }
}

// Backends hand out numeric primary keys; keep them as opaque strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
