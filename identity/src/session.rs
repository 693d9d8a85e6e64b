//! Session token issuance and verification.
//!
//! Access and refresh tokens are HS256 JWTs signed with two distinct
//! secrets, so a refresh token can never be presented as an access token
//! (or vice versa). Only access tokens carry the role claim.
//!
//! Every token carries a random `jti`, so two tokens minted for the same
//! user within the same second still differ. Refresh rotation relies on
//! that: the replacement must never equal the token it replaces.

use crate::config::SessionConfig;
use crate::error::{AuthError, Result};
use crate::state::{Principal, Role, TokenPair, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims carried by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id).
    pub sub: String,

    /// Role. Present on access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Issuer.
    pub iss: String,

    /// Issued at (unix seconds).
    pub iat: i64,

    /// Expiry (unix seconds).
    pub exp: i64,

    /// Unique token id.
    pub jti: String,
}

impl SessionClaims {
    /// The subject as a [`UserId`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidAccessToken`] if the subject is not a UUID.
    pub fn user_id(&self) -> Result<UserId> {
        UserId::parse(&self.sub).map_err(|_| AuthError::InvalidAccessToken)
    }
}

/// Mints and verifies session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: String,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    /// Build an issuer from session configuration.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            issuer: config.issuer.clone(),
        }
    }

    /// Mint an access token carrying the user id and role.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn mint_access(&self, user_id: UserId, role: Role, now: DateTime<Utc>) -> Result<String> {
        let claims = self.claims(user_id, Some(role), now, self.access_ttl);
        sign(&claims, &self.access_encoding)
    }

    /// Mint a refresh token carrying only the user id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn mint_refresh(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String> {
        let claims = self.claims(user_id, None, now, self.refresh_ttl);
        sign(&claims, &self.refresh_encoding)
    }

    /// Mint an access + refresh pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn mint_pair(&self, user_id: UserId, role: Role) -> Result<TokenPair> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.mint_access(user_id, role, now)?,
            refresh_token: self.mint_refresh(user_id, now)?,
            expires_at: now + self.access_ttl,
        })
    }

    /// Verify an access token, optionally requiring a role, and return
    /// the caller it names.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidAccessToken`] on a bad signature, expiry, wrong
    ///   issuer, malformed subject, or missing role claim
    /// - [`AuthError::InsufficientPermissions`] if `required_role` is set and
    ///   the claim differs
    pub fn verify_access(&self, token: &str, required_role: Option<Role>) -> Result<Principal> {
        let claims = self
            .check(token, &self.access_decoding)
            .ok_or(AuthError::InvalidAccessToken)?;

        let role = claims.role.ok_or(AuthError::InvalidAccessToken)?;
        if let Some(required) = required_role {
            if role != required {
                return Err(AuthError::InsufficientPermissions);
            }
        }

        Ok(Principal {
            id: claims.user_id()?,
            role,
        })
    }

    /// Verify a refresh token's signature, expiry, and issuer.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRefreshToken`] on any failure.
    pub fn verify_refresh(&self, token: &str) -> Result<SessionClaims> {
        self.check(token, &self.refresh_decoding)
            .ok_or(AuthError::InvalidRefreshToken)
    }

    fn claims(
        &self,
        user_id: UserId,
        role: Option<Role>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> SessionClaims {
        SessionClaims {
            sub: user_id.to_string(),
            role,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn check(&self, token: &str, key: &DecodingKey) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        match decode::<SessionClaims>(token, key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                None
            }
        }
    }
}

fn sign(claims: &SessionClaims, key: &EncodingKey) -> Result<String> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AuthError::Signing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(&SessionConfig::new(
            "access-secret".to_string(),
            "refresh-secret".to_string(),
        ))
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let user_id = UserId::new();
        let token = issuer.mint_access(user_id, Role::User, Utc::now()).unwrap();

        let principal = issuer.verify_access(&token, None).unwrap();
        assert_eq!(principal, Principal { id: user_id, role: Role::User });
    }

    #[test]
    fn test_required_role_mismatch_is_forbidden() {
        let issuer = issuer();
        let token = issuer.mint_access(UserId::new(), Role::User, Utc::now()).unwrap();

        assert_eq!(
            issuer.verify_access(&token, Some(Role::Admin)),
            Err(AuthError::InsufficientPermissions)
        );
        assert!(issuer.verify_access(&token, Some(Role::User)).is_ok());
    }

    #[test]
    fn test_access_claims_must_name_a_user_with_a_role() {
        let issuer = issuer();
        let now = Utc::now();

        let mut claims = issuer.claims(UserId::new(), Some(Role::User), now, issuer.access_ttl);
        claims.sub = "not-a-uuid".to_string();
        let token = sign(&claims, &issuer.access_encoding).unwrap();
        assert_eq!(issuer.verify_access(&token, None), Err(AuthError::InvalidAccessToken));

        let roleless = issuer.claims(UserId::new(), None, now, issuer.access_ttl);
        let token = sign(&roleless, &issuer.access_encoding).unwrap();
        assert_eq!(issuer.verify_access(&token, None), Err(AuthError::InvalidAccessToken));
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let user_id = UserId::new();
        let refresh = issuer.mint_refresh(user_id, Utc::now()).unwrap();
        let access = issuer.mint_access(user_id, Role::User, Utc::now()).unwrap();

        assert_eq!(issuer.verify_access(&refresh, None), Err(AuthError::InvalidAccessToken));
        assert_eq!(issuer.verify_refresh(&access), Err(AuthError::InvalidRefreshToken));
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = SessionConfig::new("a".to_string(), "b".to_string())
            .with_access_ttl(Duration::seconds(-30));
        let issuer = SessionIssuer::new(&config);
        let token = issuer.mint_access(UserId::new(), Role::Admin, Utc::now()).unwrap();

        assert_eq!(issuer.verify_access(&token, None), Err(AuthError::InvalidAccessToken));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let other = SessionIssuer::new(
            &SessionConfig::new("access-secret".to_string(), "refresh-secret".to_string())
                .with_issuer("someone-else"),
        );
        let token = other.mint_access(UserId::new(), Role::User, Utc::now()).unwrap();

        assert_eq!(issuer().verify_access(&token, None), Err(AuthError::InvalidAccessToken));
    }

    #[test]
    fn test_pairs_minted_back_to_back_differ() {
        let issuer = issuer();
        let user_id = UserId::new();
        let first = issuer.mint_pair(user_id, Role::User).unwrap();
        let second = issuer.mint_pair(user_id, Role::User).unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_ne!(first.access_token, second.access_token);
    }
}
