//! Credential store implementations.
//!
//! - **In-memory** - single-process store for tests, demos, and development
//! - **PostgreSQL** (feature `postgres`) - row-locked transactional store

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

// Re-exports
pub use memory::InMemoryCredentialStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresCredentialStore;
