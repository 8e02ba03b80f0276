//! Identity records and derivation of the locally held user.
//!
//! DESIGN
//! ======
//! The provider owns `Session` and `RawIdentity`; the coordinator owns the
//! `DerivedUser`, which is rebuilt from scratch on every session change and
//! never persisted. Derivation is a pure function so the same inputs always
//! yield the same user, which keeps duplicate sign-in events harmless.

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

/// Display name used when no other source yields one.
pub const FALLBACK_NAME: &str = "User";

/// Binary permission level gating content appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    #[must_use]
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// Provider-supplied metadata attached to an identity (e.g. from OAuth).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, alias = "full_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Application profile row. Only these fields are ever consulted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default, alias = "count")]
    pub usage_count: Option<u32>,
}

impl Profile {
    /// Decode an untyped profile row, ignoring columns this crate never reads.
    ///
    /// # Errors
    ///
    /// Returns the decode error if a known field has the wrong shape
    /// (e.g. an unknown role string).
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Identity record as reported by the provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// Provider-issued proof of an authenticated identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub identity: RawIdentity,
}

/// The coordinator's reconstruction of who is signed in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedUser {
    pub id: String,
    pub email: Option<String>,
    pub name: String,
    pub role: Role,
    pub picture: Option<String>,
    pub usage_count: u32,
}

impl DerivedUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_privileged()
    }
}

/// Build a `DerivedUser` from a raw identity.
///
/// `admin_domain` is the organizational domain (without `@`) whose addresses
/// are privileged when the profile does not state a role.
#[must_use]
pub fn derive_user(raw: &RawIdentity, admin_domain: &str) -> DerivedUser {
    let metadata = raw.metadata.as_ref();
    let profile = raw.profile.as_ref();

    let name = non_empty(metadata.and_then(|m| m.name.as_deref()))
        .or_else(|| non_empty(profile.and_then(|p| p.name.as_deref())))
        .or_else(|| raw.email.as_deref().and_then(email_local_part))
        .unwrap_or(FALLBACK_NAME)
        .to_owned();

    let role = profile
        .and_then(|p| p.role)
        .unwrap_or_else(|| infer_role(raw.email.as_deref(), admin_domain));

    let picture = metadata
        .and_then(|m| m.avatar_url.clone())
        .or_else(|| profile.and_then(|p| p.picture.clone()));

    let usage_count = profile.and_then(|p| p.usage_count).unwrap_or(1);

    DerivedUser { id: raw.id.clone(), email: raw.email.clone(), name, role, picture, usage_count }
}

/// Domain-based role inference. Comparison ignores ASCII case.
#[must_use]
pub fn infer_role(email: Option<&str>, admin_domain: &str) -> Role {
    let Some(email) = email else {
        return Role::User;
    };
    let Some((_, domain)) = email.rsplit_once('@') else {
        return Role::User;
    };
    if !admin_domain.is_empty() && domain.eq_ignore_ascii_case(admin_domain) {
        Role::Admin
    } else {
        Role::User
    }
}

fn email_local_part(email: &str) -> Option<&str> {
    non_empty(email.split('@').next())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
