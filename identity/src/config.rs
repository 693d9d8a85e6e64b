//! Identity lifecycle configuration.
//!
//! Configuration values should be provided by the application, not hardcoded.
//! [`IdentityConfig::from_env`] covers the common deployment case.

use crate::error::{AuthError, Result};
use chrono::Duration;
use std::env;

/// Default number of random bytes behind every single-use token.
pub const DEFAULT_TOKEN_BYTES: usize = 128;

/// Session (JWT) configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC secret for access tokens.
    pub access_secret: String,

    /// HMAC secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,

    /// Access token lifetime.
    ///
    /// Default: 15 minutes
    pub access_ttl: Duration,

    /// Refresh token lifetime.
    ///
    /// Default: 7 days
    pub refresh_ttl: Duration,

    /// `iss` claim written into and required from every token.
    pub issuer: String,
}

impl SessionConfig {
    /// Create session configuration with default lifetimes.
    #[must_use]
    pub fn new(access_secret: String, refresh_secret: String) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            issuer: "warden".to_string(),
        }
    }

    /// Set access token lifetime.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Set refresh token lifetime.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Set the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl PasswordHashConfig {
    /// OWASP-recommended Argon2id minimums (19 MiB, 2 passes, 1 lane).
    #[must_use]
    pub const fn recommended() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self::recommended()
    }
}

/// Top-level identity lifecycle configuration.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Product name shown in email subjects.
    pub project_name: String,

    /// Support contact shown to suspended users.
    pub support_email: String,

    /// Public base URL used to build links (e.g., "https://api.example.com").
    pub public_base_url: String,

    /// Route serving account confirmation, relative to `public_base_url`.
    pub confirm_account_route: String,

    /// Route serving password reset, relative to `public_base_url`.
    pub reset_password_route: String,

    /// Route serving email-change confirmation, relative to `public_base_url`.
    pub confirm_email_change_route: String,

    /// Random bytes per single-use token.
    ///
    /// Default: 128
    pub token_bytes: usize,

    /// Session token settings.
    pub session: SessionConfig,

    /// Password hashing cost.
    pub password_hash: PasswordHashConfig,
}

impl IdentityConfig {
    /// Create configuration with default routes and costs.
    ///
    /// # Arguments
    ///
    /// * `public_base_url` - Base URL for links (e.g., "https://api.example.com")
    /// * `session` - Session signing configuration
    #[must_use]
    pub fn new(public_base_url: String, session: SessionConfig) -> Self {
        Self {
            project_name: "Warden".to_string(),
            support_email: "support@example.com".to_string(),
            public_base_url,
            confirm_account_route: "/api/users/confirm-account".to_string(),
            reset_password_route: "/api/users/reset-password".to_string(),
            confirm_email_change_route: "/api/users/confirm-change-email".to_string(),
            token_bytes: DEFAULT_TOKEN_BYTES,
            session,
            password_hash: PasswordHashConfig::recommended(),
        }
    }

    /// Set the product name.
    #[must_use]
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    /// Set the support contact.
    #[must_use]
    pub fn with_support_email(mut self, email: impl Into<String>) -> Self {
        self.support_email = email.into();
        self
    }

    /// Set token length in bytes.
    #[must_use]
    pub const fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes;
        self
    }

    /// Set password hashing cost.
    #[must_use]
    pub const fn with_password_hash(mut self, params: PasswordHashConfig) -> Self {
        self.password_hash = params;
        self
    }

    /// Absolute URL of the account confirmation route.
    #[must_use]
    pub fn confirm_account_url(&self) -> String {
        join_url(&self.public_base_url, &self.confirm_account_route)
    }

    /// Absolute URL of the password reset route.
    #[must_use]
    pub fn reset_password_url(&self) -> String {
        join_url(&self.public_base_url, &self.reset_password_route)
    }

    /// Absolute URL of the email-change confirmation route.
    #[must_use]
    pub fn confirm_email_change_url(&self) -> String {
        join_url(&self.public_base_url, &self.confirm_email_change_route)
    }

    /// Load configuration from environment variables.
    ///
    /// Required: `ACCESS_TOKEN_SECRET`, `REFRESH_TOKEN_SECRET`.
    /// Optional: `PUBLIC_BASE_URL`, `PROJECT_NAME`, `SUPPORT_EMAIL`,
    /// `ACCESS_TOKEN_EXPIRY` / `REFRESH_TOKEN_EXPIRY` (seconds), `TOKEN_BYTES`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if a required variable is missing,
    /// a numeric variable does not parse, or [`Self::validate`] fails.
    pub fn from_env() -> Result<Self> {
        let access_secret = required_var("ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required_var("REFRESH_TOKEN_SECRET")?;

        let mut session = SessionConfig::new(access_secret, refresh_secret);
        if let Some(secs) = parsed_var::<i64>("ACCESS_TOKEN_EXPIRY")? {
            session = session.with_access_ttl(Duration::seconds(secs));
        }
        if let Some(secs) = parsed_var::<i64>("REFRESH_TOKEN_EXPIRY")? {
            session = session.with_refresh_ttl(Duration::seconds(secs));
        }

        let base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let mut config = Self::new(base_url, session);

        if let Ok(name) = env::var("PROJECT_NAME") {
            config = config.with_project_name(name);
        }
        if let Ok(email) = env::var("SUPPORT_EMAIL") {
            config = config.with_support_email(email);
        }
        if let Some(bytes) = parsed_var::<usize>("TOKEN_BYTES")? {
            config = config.with_token_bytes(bytes);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if a secret is empty, both secrets
    /// are identical, a TTL is not positive, or `token_bytes` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.session.access_secret.is_empty() || self.session.refresh_secret.is_empty() {
            return Err(AuthError::Configuration("token secrets must not be empty".to_string()));
        }
        if self.session.access_secret == self.session.refresh_secret {
            return Err(AuthError::Configuration(
                "access and refresh secrets must differ".to_string(),
            ));
        }
        if self.session.access_ttl <= Duration::zero() || self.session.refresh_ttl <= Duration::zero() {
            return Err(AuthError::Configuration("token lifetimes must be positive".to_string()));
        }
        if self.token_bytes == 0 {
            return Err(AuthError::Configuration("token_bytes must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn join_url(base: &str, route: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), route.trim_start_matches('/'))
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| AuthError::Configuration(format!("{name} must be set")))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AuthError::Configuration(format!("{name} is not a valid number: {raw}"))),
        Err(_) => Ok(None),
    }
}
