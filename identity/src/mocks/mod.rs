//! Mock collaborator implementations for testing.
//!
//! In-memory, deterministic implementations of the collaborator traits.
//! Pair them with [`InMemoryCredentialStore`](crate::stores::InMemoryCredentialStore)
//! to drive the whole lifecycle in unit and integration tests.

pub mod email;
pub mod media;
pub mod tokens;
pub mod verifier;

pub use email::{RecordingDispatcher, SentEmail};
pub use media::RecordingMediaStore;
pub use tokens::SequentialTokenGenerator;
pub use verifier::MockIdentityVerifier;
