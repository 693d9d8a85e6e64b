//! Password recovery, password change, and email change.

mod common;

use common::{PASSWORD, confirmed, fixture};
use warden_identity::{AuthError, CredentialStore, Principal, Role};

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let f = fixture();
    let id = confirmed(&f, "annlee", "ann@example.com").await;

    f.manager.forgot_password("ann@example.com").await.unwrap();
    let email = f.notifier.last_to("ann@example.com").unwrap();
    assert_eq!(email.subject, "Acme Password Reset");
    assert!(email.html.contains("/api/users/reset-password?"));
    let token = email.link_param("resetPasswordToken").unwrap();

    f.manager.reset_password(id, &token, "brand-new-pass").await.unwrap();

    assert!(f.manager.login("annlee", "brand-new-pass", None).await.is_ok());
    assert_eq!(
        f.manager.login("annlee", PASSWORD, None).await,
        Err(AuthError::InvalidCredentials)
    );
}

#[tokio::test]
async fn test_second_forgot_password_invalidates_first_token() {
    let f = fixture();
    let id = confirmed(&f, "annlee", "ann@example.com").await;

    f.manager.forgot_password("ann@example.com").await.unwrap();
    let first = f
        .notifier
        .last_to("ann@example.com")
        .and_then(|e| e.link_param("resetPasswordToken"))
        .unwrap();
    f.manager.forgot_password("ann@example.com").await.unwrap();
    let second = f
        .notifier
        .last_to("ann@example.com")
        .and_then(|e| e.link_param("resetPasswordToken"))
        .unwrap();

    assert_eq!(
        f.manager.reset_password(id, &first, "brand-new-pass").await,
        Err(AuthError::InvalidResetToken)
    );
    assert!(f.manager.reset_password(id, &second, "brand-new-pass").await.is_ok());
}

#[tokio::test]
async fn test_change_password_sends_notice() {
    let f = fixture();
    let id = confirmed(&f, "annlee", "ann@example.com").await;
    let principal = Principal { id, role: Role::User };

    f.manager
        .change_password(&principal, PASSWORD, "brand-new-pass")
        .await
        .unwrap();

    assert_eq!(
        f.notifier.last_to("ann@example.com").unwrap().subject,
        "Password changed"
    );
    assert!(f.manager.login("annlee", "brand-new-pass", None).await.is_ok());
}

#[tokio::test]
async fn test_federated_account_has_no_password_to_change() {
    let f = fixture();
    let session = f.manager.social_login("gh-bob").await.unwrap();
    let principal = Principal {
        id: session.user.id,
        role: Role::User,
    };

    assert!(matches!(
        f.manager.change_password(&principal, "x", "brand-new-pass").await,
        Err(AuthError::FederatedAccount { .. })
    ));
}

#[tokio::test]
async fn test_email_change() {
    let f = fixture();
    let id = confirmed(&f, "annlee", "ann@example.com").await;
    let principal = Principal { id, role: Role::User };

    f.manager
        .request_email_change(&principal, "ann@new.example.com", PASSWORD)
        .await
        .unwrap();

    let email = f.notifier.last_to("ann@new.example.com").unwrap();
    assert_eq!(email.subject, "Acme Email change request");
    assert!(email.html.contains("/api/users/confirm-change-email?"));
    let token = email.link_param("confirmationToken").unwrap();

    // The old address still logs in until confirmation.
    assert!(f.manager.login("ann@example.com", PASSWORD, None).await.is_ok());

    let profile = f.manager.confirm_email_change(id, &token).await.unwrap();
    assert_eq!(profile.email, "ann@new.example.com");

    assert_eq!(
        f.manager.login("ann@example.com", PASSWORD, None).await,
        Err(AuthError::UserNotFound)
    );
    assert!(f.manager.login("ann@new.example.com", PASSWORD, None).await.is_ok());
    assert_eq!(
        f.notifier.last_to("ann@example.com").unwrap().subject,
        "Email changed"
    );
}

#[tokio::test]
async fn test_email_change_to_taken_address_sends_nothing() {
    let f = fixture();
    let id = confirmed(&f, "annlee", "ann@example.com").await;
    confirmed(&f, "carol", "carol@example.com").await;
    f.notifier.clear();

    let result = f
        .manager
        .request_email_change(&Principal { id, role: Role::User }, "carol@example.com", PASSWORD)
        .await;

    assert_eq!(result, Err(AuthError::EmailInUse));
    assert!(f.notifier.sent().is_empty());

    let stored = f.store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.authentication.change_email_token, None);
    assert_eq!(stored.authentication.pending_email, None);
}

#[tokio::test]
async fn test_email_change_loses_to_later_registration() {
    let f = fixture();
    let id = confirmed(&f, "annlee", "ann@example.com").await;

    f.manager
        .request_email_change(&Principal { id, role: Role::User }, "dan@example.com", PASSWORD)
        .await
        .unwrap();
    let token = f
        .notifier
        .last_to("dan@example.com")
        .and_then(|e| e.link_param("confirmationToken"))
        .unwrap();

    // Someone registers the candidate address before the link is clicked.
    confirmed(&f, "danny", "dan@example.com").await;

    assert_eq!(
        f.manager.confirm_email_change(id, &token).await,
        Err(AuthError::EmailInUse)
    );
}
