//! In-memory credential store.
//!
//! One mutex guards the records and both unique indexes, so every trait
//! operation (guard + mutation + index maintenance) runs as a single
//! critical section. No `.await` happens while the lock is held.

use crate::commands::{UpdateOutcome, UserCommand};
use crate::error::{AuthError, Result};
use crate::providers::CredentialStore;
use crate::state::{Role, User, UserId};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
    by_username: HashMap<String, UserId>,
}

impl Inner {
    fn get_by(&self, index: &HashMap<String, UserId>, key: &str) -> Option<User> {
        index.get(key).and_then(|id| self.users.get(id)).cloned()
    }

    /// Ensure `user`'s unique fields are free or already belong to it.
    fn check_unique(&self, user: &User) -> std::result::Result<(), &'static str> {
        if self.by_email.get(&user.email).is_some_and(|owner| *owner != user.id) {
            return Err("email");
        }
        if self
            .by_username
            .get(&user.username)
            .is_some_and(|owner| *owner != user.id)
        {
            return Err("username");
        }
        Ok(())
    }

    fn reindex(&mut self, previous: &User, current: &User) {
        if previous.email != current.email {
            self.by_email.remove(&previous.email);
            self.by_email.insert(current.email.clone(), current.id);
        }
        if previous.username != current.username {
            self.by_username.remove(&previous.username);
            self.by_username.insert(current.username.clone(), current.id);
        }
    }
}

/// Credential store held entirely in process memory.
///
/// Cloning shares the underlying records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.users.len())
    }

    /// Whether the store is empty.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| AuthError::Storage("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.lock()?;
        Ok(inner.get_by(&inner.by_email, email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.lock()?;
        Ok(inner.get_by(&inner.by_username, username))
    }

    async fn create_user(&self, user: User) -> Result<User> {
        let mut inner = self.lock()?;

        inner
            .check_unique(&user)
            .map_err(|field| AuthError::DuplicateField { field })?;
        if inner.users.contains_key(&user.id) {
            return Err(AuthError::Storage(format!("duplicate user id {}", user.id)));
        }

        inner.by_email.insert(user.email.clone(), user.id);
        inner.by_username.insert(user.username.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_if_match(&self, id: UserId, command: &UserCommand) -> Result<UpdateOutcome> {
        let mut inner = self.lock()?;

        let previous = inner.users.get(&id).cloned().ok_or(AuthError::UserNotFound)?;
        let mut current = previous.clone();

        if let Err(rejection) = command.apply(&mut current, Utc::now()) {
            return Ok(UpdateOutcome::Rejected(rejection));
        }

        inner.check_unique(&current).map_err(|field| match field {
            "email" => AuthError::EmailInUse,
            field => AuthError::DuplicateField { field },
        })?;

        inner.reindex(&previous, &current);
        inner.users.insert(id, current.clone());

        Ok(UpdateOutcome::Applied {
            previous: Box::new(previous),
            current: Box::new(current),
        })
    }

    async fn delete_if_role(&self, id: UserId, required_role: Role) -> Result<Option<User>> {
        let mut inner = self.lock()?;

        let Some(user) = inner.users.get(&id) else {
            return Ok(None);
        };
        if user.authentication.role != required_role {
            return Err(AuthError::ProtectedAccount);
        }

        let user = inner.users.remove(&id);
        if let Some(user) = &user {
            inner.by_email.remove(&user.email);
            inner.by_username.remove(&user.username);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Rejection;
    use crate::state::Authentication;

    fn user(username: &str, email: &str) -> User {
        User::new(
            "Test".to_string(),
            username.to_string(),
            email.to_string(),
            Authentication::local("hash".to_string()),
        )
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryCredentialStore::new();
        let created = store.create_user(user("ann1", "ann@x.com")).await.unwrap();

        assert_eq!(store.find_by_id(created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_email("ann@x.com").await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_identifier("ann1").await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_identifier("ann@x.com").await.unwrap(), Some(created));
        assert_eq!(store.find_by_identifier("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_email_first() {
        let store = InMemoryCredentialStore::new();
        store.create_user(user("ann1", "ann@x.com")).await.unwrap();

        assert_eq!(
            store.create_user(user("ann1", "ann@x.com")).await,
            Err(AuthError::DuplicateField { field: "email" })
        );
        assert_eq!(
            store.create_user(user("ann1", "other@x.com")).await,
            Err(AuthError::DuplicateField { field: "username" })
        );
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_rejection_writes_nothing() {
        let store = InMemoryCredentialStore::new();
        let created = store.create_user(user("ann1", "ann@x.com")).await.unwrap();

        let outcome = store
            .update_if_match(
                created.id,
                &UserCommand::ConfirmAccount {
                    token: "nope".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::Rejected(Rejection::TokenMismatch));
        assert_eq!(store.find_by_id(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_email_promotion_respects_uniqueness() {
        let store = InMemoryCredentialStore::new();
        let ann = store.create_user(user("ann1", "ann@x.com")).await.unwrap();
        store.create_user(user("bob1", "bob@x.com")).await.unwrap();

        store
            .update_if_match(
                ann.id,
                &UserCommand::RequestEmailChange {
                    pending_email: "bob@x.com".to_string(),
                    token: "C".to_string(),
                },
            )
            .await
            .unwrap();

        let result = store
            .update_if_match(ann.id, &UserCommand::ConfirmEmailChange { token: "C".to_string() })
            .await;
        assert_eq!(result, Err(AuthError::EmailInUse));

        let stored = store.find_by_id(ann.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "ann@x.com");
    }

    #[tokio::test]
    async fn test_username_change_reindexes() {
        let store = InMemoryCredentialStore::new();
        let ann = store.create_user(user("ann1", "ann@x.com")).await.unwrap();

        store
            .update_if_match(
                ann.id,
                &UserCommand::UpdateProfile {
                    name: None,
                    username: Some("ann2".to_string()),
                    avatar: None,
                },
            )
            .await
            .unwrap();

        assert!(store.find_by_username("ann1").await.unwrap().is_none());
        assert!(store.find_by_username("ann2").await.unwrap().is_some());
        // The old username is free again.
        store.create_user(user("ann1", "new@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_is_role_guarded() {
        let store = InMemoryCredentialStore::new();
        let mut admin = user("root", "root@x.com");
        admin.authentication.role = Role::Admin;
        let admin = store.create_user(admin).await.unwrap();
        let ann = store.create_user(user("ann1", "ann@x.com")).await.unwrap();

        assert_eq!(
            store.delete_if_role(admin.id, Role::User).await,
            Err(AuthError::ProtectedAccount)
        );
        assert_eq!(store.delete_if_role(ann.id, Role::User).await.unwrap(), Some(ann.clone()));
        assert_eq!(store.delete_if_role(ann.id, Role::User).await.unwrap(), None);
        assert!(store.find_by_email("ann@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = InMemoryCredentialStore::new();
        let result = store
            .update_if_match(UserId::new(), &UserCommand::SetBanStatus { banned: true })
            .await;
        assert_eq!(result, Err(AuthError::UserNotFound));
    }
}
