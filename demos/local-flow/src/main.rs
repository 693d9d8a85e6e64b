//! Local identity walkthrough.
//!
//! Drives one account through the main lifecycle against in-memory
//! collaborators and prints each response envelope as JSON. Emails are
//! logged by the console dispatcher instead of being sent.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=warden_identity=debug cargo run --bin local-flow
//! ```

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_identity::constants::messages;
use warden_identity::mocks::MockIdentityVerifier;
use warden_identity::password::Argon2PasswordHasher;
use warden_identity::providers::{ConsoleDispatcher, DiscardMediaStore};
use warden_identity::stores::InMemoryCredentialStore;
use warden_identity::tokens::OsTokenGenerator;
use warden_identity::{
    ApiResponse, IdentityConfig, IdentityEnvironment, IdentityManager, IdentityProvider,
    Registration, SessionConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "local_flow=info,warden_identity=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = IdentityConfig::from_env().unwrap_or_else(|_| {
        IdentityConfig::new(
            "http://localhost:3000".to_string(),
            SessionConfig::new(
                "local-access-secret".to_string(),
                "local-refresh-secret".to_string(),
            ),
        )
    });

    let env = IdentityEnvironment::new(
        InMemoryCredentialStore::new(),
        ConsoleDispatcher::new(),
        MockIdentityVerifier::new().with_identity(
            "demo-assertion",
            "Grace Hopper",
            "grace@example.com",
            IdentityProvider::GitHub,
        ),
        DiscardMediaStore,
        OsTokenGenerator::new(),
        Argon2PasswordHasher::new(config.password_hash)?,
    );
    let manager = IdentityManager::new(config, env)?;

    info!("=== Local identity flow ===");

    let registered = manager
        .register(Registration {
            name: "Ada Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "analytical-engine".to_string(),
        })
        .await?;
    let user_id = registered.user.id;
    print_envelope(&ApiResponse::ok(201, messages::REGISTERED, &registered.user))?;

    let confirmed = manager
        .confirm_account(user_id, &registered.confirmation_token)
        .await?;
    print_envelope(&ApiResponse::ok(200, messages::ACCOUNT_CONFIRMED, confirmed))?;

    let session = manager
        .login("ada", "analytical-engine", Some("Mozilla/5.0 (X11; Linux x86_64)"))
        .await?;
    print_envelope(&ApiResponse::ok(200, messages::LOGGED_IN, &session))?;

    let principal = manager.authenticate(&session.tokens.access_token, None)?;
    info!(user_id = %principal.id, role = principal.role.as_str(), "Access token verified");

    let rotated = manager.refresh(user_id, &session.tokens.refresh_token).await?;
    print_envelope(&ApiResponse::ok(200, messages::TOKEN_REFRESHED, rotated))?;

    // Replaying the rotated-away refresh token is rejected.
    if let Err(e) = manager.refresh(user_id, &session.tokens.refresh_token).await {
        print_envelope(&ApiResponse::from_error(&e))?;
    }

    let federated = manager.social_login("demo-assertion").await?;
    print_envelope(&ApiResponse::ok(200, messages::LOGGED_IN, &federated.user))?;

    Ok(())
}

fn print_envelope<T: Serialize>(response: &ApiResponse<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}
