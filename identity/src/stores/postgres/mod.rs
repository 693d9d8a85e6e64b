//! PostgreSQL storage implementations.
//!
//! Schema lives in `identity/migrations/` and is applied by
//! [`PostgresCredentialStore::migrate`].

pub mod credentials;

// Re-exports
pub use credentials::PostgresCredentialStore;
