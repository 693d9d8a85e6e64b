//! Shared fixtures for integration tests.

#![allow(dead_code)]

use warden_identity::mocks::{MockIdentityVerifier, RecordingDispatcher, RecordingMediaStore};
use warden_identity::password::Argon2PasswordHasher;
use warden_identity::stores::InMemoryCredentialStore;
use warden_identity::tokens::OsTokenGenerator;
use warden_identity::{
    IdentityConfig, IdentityEnvironment, IdentityManager, IdentityProvider, PasswordHashConfig,
    Registration, SessionConfig, UserId,
};

pub type Manager = IdentityManager<
    InMemoryCredentialStore,
    RecordingDispatcher,
    MockIdentityVerifier,
    RecordingMediaStore,
    OsTokenGenerator,
    Argon2PasswordHasher,
>;

pub struct Fixture {
    pub manager: Manager,
    pub store: InMemoryCredentialStore,
    pub notifier: RecordingDispatcher,
    pub media: RecordingMediaStore,
}

pub const PASSWORD: &str = "correct-horse";

pub fn fixture() -> Fixture {
    let cheap = PasswordHashConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };
    let config = IdentityConfig::new(
        "https://api.example.com".to_string(),
        SessionConfig::new("test-access-secret".to_string(), "test-refresh-secret".to_string()),
    )
    .with_project_name("Acme")
    .with_support_email("help@example.com")
    .with_password_hash(cheap);

    let store = InMemoryCredentialStore::new();
    let notifier = RecordingDispatcher::new();
    let media = RecordingMediaStore::new();
    let verifier = MockIdentityVerifier::new()
        .with_identity("gh-bob", "Bob Stone", "bob@example.com", IdentityProvider::GitHub)
        .with_identity("google-ann", "Ann Lee", "ann@example.com", IdentityProvider::Google)
        .with_identity("gh-ann", "Ann Lee", "ann@example.com", IdentityProvider::GitHub);

    let env = IdentityEnvironment::new(
        store.clone(),
        notifier.clone(),
        verifier,
        media.clone(),
        OsTokenGenerator::new(),
        Argon2PasswordHasher::new(cheap).unwrap(),
    );

    Fixture {
        manager: IdentityManager::new(config, env).unwrap(),
        store,
        notifier,
        media,
    }
}

pub fn registration(username: &str, email: &str) -> Registration {
    Registration {
        name: "Ann Lee".to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
    }
}

/// Register, then confirm through the emailed link.
pub async fn confirmed(f: &Fixture, username: &str, email: &str) -> UserId {
    let registered = f.manager.register(registration(username, email)).await.unwrap();
    let token = f
        .notifier
        .last_to(email)
        .and_then(|e| e.link_param("confirmationToken"))
        .unwrap();
    f.manager.confirm_account(registered.user.id, &token).await.unwrap();
    registered.user.id
}
