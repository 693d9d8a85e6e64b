//! Identity state types.
//!
//! This module defines the persisted user record and the projections of it
//! that are safe to hand back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a `UserId` from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Roles & Credential Origins
// ═══════════════════════════════════════════════════════════════════════

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account.
    #[default]
    User,
    /// Administrator.
    Admin,
}

impl Role {
    /// Get the role name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse role from string.
    ///
    /// # Errors
    ///
    /// Returns error if the role string is not recognized.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// Federated identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProvider {
    /// Google.
    Google,
    /// GitHub.
    GitHub,
    /// Microsoft.
    Microsoft,
}

impl IdentityProvider {
    /// Get the provider name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
            Self::Microsoft => "microsoft",
        }
    }

    /// Parse provider from a name or a sign-in provider domain.
    ///
    /// Accepts both `"google"` and `"google.com"`.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is not recognized.
    pub fn parse(s: &str) -> Result<Self, String> {
        let name = s.split('.').next().unwrap_or_default();
        match name.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            "microsoft" => Ok(Self::Microsoft),
            _ => Err(format!("Unknown identity provider: {s}")),
        }
    }
}

/// Where an account's credential comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "provider")]
pub enum AuthType {
    /// Local password.
    Local,
    /// Federated identity provider.
    Federated(IdentityProvider),
}

impl AuthType {
    /// Returns `true` for password accounts.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Storage/display name (`"email+password"` or the provider name).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "email+password",
            Self::Federated(provider) => provider.as_str(),
        }
    }

    /// Parse from the storage name.
    ///
    /// # Errors
    ///
    /// Returns error if the name is neither `"email+password"` nor a known provider.
    pub fn parse(s: &str) -> Result<Self, String> {
        if s == "email+password" {
            Ok(Self::Local)
        } else {
            IdentityProvider::parse(s).map(Self::Federated)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// User Record
// ═══════════════════════════════════════════════════════════════════════

/// Avatar stored with an external media service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    /// Public URL.
    pub url: String,
    /// Asset id at the media service, used for cleanup on delete.
    pub asset_id: Option<String>,
}

/// Credential sub-record.
///
/// Every `Option<String>` token is `Some` only while its flow is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    /// Argon2 PHC string. Present iff `auth_type` is [`AuthType::Local`].
    pub password_hash: Option<String>,

    /// Account role.
    pub role: Role,

    /// Credential origin.
    pub auth_type: AuthType,

    /// Set once, at confirmation. Never reverts.
    pub is_account_confirmed: bool,

    /// Pending account confirmation token.
    pub confirmation_token: Option<String>,

    /// Pending password reset token.
    pub reset_password_token: Option<String>,

    /// Pending email-change token.
    pub change_email_token: Option<String>,

    /// Candidate email between change request and confirmation.
    pub pending_email: Option<String>,

    /// The single valid refresh token, if a session is active.
    pub refresh_token: Option<String>,
}

impl Authentication {
    /// Credentials for a new password account (unconfirmed).
    #[must_use]
    pub const fn local(password_hash: String) -> Self {
        Self {
            password_hash: Some(password_hash),
            role: Role::User,
            auth_type: AuthType::Local,
            is_account_confirmed: false,
            confirmation_token: None,
            reset_password_token: None,
            change_email_token: None,
            pending_email: None,
            refresh_token: None,
        }
    }

    /// Credentials for a new federated account (pre-confirmed, no password).
    #[must_use]
    pub const fn federated(provider: IdentityProvider) -> Self {
        Self {
            password_hash: None,
            role: Role::User,
            auth_type: AuthType::Federated(provider),
            is_account_confirmed: true,
            confirmation_token: None,
            reset_password_token: None,
            change_email_token: None,
            pending_email: None,
            refresh_token: None,
        }
    }
}

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,

    /// Display name.
    pub name: String,

    /// Unique username.
    pub username: String,

    /// Unique live email address.
    pub email: String,

    /// Avatar, if uploaded.
    pub avatar: Option<Avatar>,

    /// Credentials.
    pub authentication: Authentication,

    /// Banned flag.
    pub is_banned: bool,

    /// Account created timestamp.
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new record stamped with the current time.
    #[must_use]
    pub fn new(name: String, username: String, email: String, authentication: Authentication) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name,
            username,
            email,
            avatar: None,
            authentication,
            is_banned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sanitized projection (no secrets, no ban flag).
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Projections
// ═══════════════════════════════════════════════════════════════════════

/// Sanitized user projection returned by lifecycle operations.
///
/// Never contains the password hash, pending tokens, refresh token, or ban flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Username.
    pub username: String,
    /// Live email.
    pub email: String,
    /// Avatar.
    pub avatar: Option<Avatar>,
    /// Role.
    pub role: Role,
    /// Credential origin.
    pub auth_type: AuthType,
    /// Confirmation state.
    pub is_account_confirmed: bool,
    /// Account created timestamp.
    pub created_at: DateTime<Utc>,
    /// Last updated timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.authentication.role,
            auth_type: user.authentication.auth_type,
            is_account_confirmed: user.authentication.is_account_confirmed,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Public profile, visible to anyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    /// User ID.
    pub id: UserId,
    /// Username.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Avatar.
    pub avatar: Option<Avatar>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// The authenticated caller, as established by an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Caller's user id.
    pub id: UserId,
    /// Caller's role at the time the token was minted.
    pub role: Role,
}

/// Access + refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived access token (`JWT`, signed with the access secret).
    pub access_token: String,

    /// Long-lived refresh token (`JWT`, signed with the refresh secret).
    pub refresh_token: String,

    /// Access token expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_generation() {
        let id1 = UserId::new();
        let id2 = UserId::new();

        assert_ne!(id1, id2);
        assert_eq!(UserId::parse(&id1.to_string()), Ok(id1));
    }

    #[test]
    fn test_auth_type_names() {
        assert_eq!(AuthType::Local.as_str(), "email+password");
        assert_eq!(AuthType::Federated(IdentityProvider::GitHub).as_str(), "github");
        assert_eq!(AuthType::parse("email+password"), Ok(AuthType::Local));
        assert_eq!(
            AuthType::parse("google"),
            Ok(AuthType::Federated(IdentityProvider::Google))
        );
        assert!(AuthType::parse("myspace").is_err());
    }

    #[test]
    fn test_provider_accepts_sign_in_domain() {
        assert_eq!(IdentityProvider::parse("google.com"), Ok(IdentityProvider::Google));
        assert_eq!(IdentityProvider::parse("GitHub.com"), Ok(IdentityProvider::GitHub));
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Ok(role));
        }
    }

    #[test]
    fn test_password_hash_presence_follows_auth_type() {
        let local = Authentication::local("$argon2id$...".to_string());
        assert!(local.password_hash.is_some());
        assert!(!local.is_account_confirmed);

        let federated = Authentication::federated(IdentityProvider::Google);
        assert!(federated.password_hash.is_none());
        assert!(federated.is_account_confirmed);
    }

    #[test]
    fn test_profile_strips_secrets() {
        let mut user = User::new(
            "Ann".to_string(),
            "ann1".to_string(),
            "ann@x.com".to_string(),
            Authentication::local("hash".to_string()),
        );
        user.authentication.refresh_token = Some("refresh".to_string());
        user.is_banned = true;

        let json = serde_json::to_value(user.profile()).unwrap();
        let text = json.to_string();
        assert!(!text.contains("hash"));
        assert!(!text.contains("refresh"));
        assert!(json.get("isBanned").is_none());
        assert_eq!(json["username"], "ann1");
    }
}
