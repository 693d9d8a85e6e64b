//! Collaborator interfaces.
//!
//! The lifecycle manager depends on these traits, never on a concrete
//! backend. The composition root picks the implementations:
//!
//! - **Testing**: in-memory store and the recording mocks
//! - **Production**: Postgres store, SMTP dispatcher, a real verifier
//! - **Development**: in-memory store, console dispatcher
//!
//! ```text
//! IdentityManager ──► CredentialStore        (state)
//!                 ──► NotificationDispatcher (side effect, best-effort)
//!                 ──► IdentityVerifier       (trust decision)
//!                 ──► MediaStore             (side effect, best-effort)
//! ```

pub mod console_email;
pub mod email;
pub mod media;
pub mod smtp_email;
pub mod store;
pub mod verifier;

pub use console_email::ConsoleDispatcher;
pub use email::NotificationDispatcher;
pub use media::{DiscardMediaStore, MediaStore};
pub use smtp_email::SmtpDispatcher;
pub use store::CredentialStore;
pub use verifier::{IdentityVerifier, VerifiedIdentity};
