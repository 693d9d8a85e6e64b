//! # Warden Identity
//!
//! Identity and credential lifecycle for user-facing services: registration,
//! account confirmation, password and federated login, refresh-token
//! rotation, password recovery, two-phase email change, and administrative
//! ban/delete.
//!
//! ## Features
//!
//! - **Atomic transitions**: every state change is one conditional update
//!   ([`CredentialStore::update_if_match`]), so single-use tokens are
//!   consumed exactly once even under concurrent redemption
//! - **Single active session**: one refresh token per account, rotated on use
//! - **Enumeration-resistant**: email-keyed recovery flows answer identically
//!   for unknown addresses
//! - **Best-effort notifications**: delivery failures never undo a commit
//! - **Testable**: in-memory store and recording mocks drive every flow
//!
//! ## Architecture
//!
//! ```text
//! transport ──► IdentityManager ──► CredentialStore   (atomic guarded updates)
//!                     │        ├──► SessionIssuer     (HS256 access/refresh)
//!                     │        ├──► PasswordHasher    (Argon2id, blocking pool)
//!                     │        └──► TokenGenerator    (OS entropy)
//!                     └──► NotificationDispatcher / MediaStore (best-effort)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_identity::*;
//!
//! let manager = IdentityManager::new(config, env)?;
//!
//! let registered = manager.register(registration).await?;
//! manager
//!     .confirm_account(registered.user.id, &registered.confirmation_token)
//!     .await?;
//!
//! let session = manager.login("ann1", "secret12", Some(user_agent)).await?;
//! let principal = manager.authenticate(&session.tokens.access_token, None)?;
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod commands;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod links;
pub mod password;
pub mod providers;
pub mod response;
pub mod session;
pub mod state;
pub mod stores;
pub mod templates;
pub mod tokens;
pub mod utils;

// Mocks for testing (only available in test builds or with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use commands::{Rejection, UpdateOutcome, UserCommand};
pub use config::{IdentityConfig, PasswordHashConfig, SessionConfig};
pub use environment::IdentityEnvironment;
pub use error::{AuthError, ErrorKind, Result};
pub use lifecycle::{
    AccountUpdate, BanAction, IdentityManager, LoginSession, RegisteredUser, Registration,
    StatusChange,
};
pub use providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
pub use response::ApiResponse;
pub use state::{
    AuthType, Authentication, Avatar, IdentityProvider, Principal, PublicProfile, Role, TokenPair,
    User, UserId, UserProfile,
};
