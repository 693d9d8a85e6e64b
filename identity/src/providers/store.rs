//! Credential store trait.

use crate::commands::{UpdateOutcome, UserCommand};
use crate::error::Result;
use crate::state::{Role, User, UserId};
use std::future::Future;

/// Persistent user records with atomic conditional updates.
///
/// # Atomicity contract
///
/// - [`create_user`](Self::create_user) is an "insert if unique" operation:
///   the username/email uniqueness check and the insert happen as one step.
/// - [`update_if_match`](Self::update_if_match) evaluates the command's guard
///   and applies its mutation as one step. Two concurrent calls presenting the
///   same single-use token must not both observe `Applied`.
/// - [`delete_if_role`](Self::delete_if_role) checks the role and deletes as
///   one step.
///
/// Email lookups are exact matches on the live email (never the pending one).
pub trait CredentialStore: Send + Sync {
    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the backend fails.
    fn find_by_id(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Get a user by live email address.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the backend fails.
    fn find_by_email(&self, email: &str) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the backend fails.
    fn find_by_username(&self, username: &str)
    -> impl Future<Output = Result<Option<User>>> + Send;

    /// Get a user by username, falling back to email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](crate::AuthError::Storage) if the backend fails.
    fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send {
        async move {
            match self.find_by_username(identifier).await? {
                Some(user) => Ok(Some(user)),
                None => self.find_by_email(identifier).await,
            }
        }
    }

    /// Insert a new record if its username and email are both unused.
    ///
    /// # Errors
    ///
    /// - [`AuthError::DuplicateField`](crate::AuthError::DuplicateField) naming
    ///   the conflicting field (email is checked first)
    /// - [`AuthError::Storage`](crate::AuthError::Storage) if the backend fails
    fn create_user(&self, user: User) -> impl Future<Output = Result<User>> + Send;

    /// Apply `command` to the record with `id` if its guard holds.
    ///
    /// A guard failure is reported as [`UpdateOutcome::Rejected`], not an error.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`](crate::AuthError::UserNotFound) if no record has `id`
    /// - [`AuthError::EmailInUse`](crate::AuthError::EmailInUse) or
    ///   [`AuthError::DuplicateField`](crate::AuthError::DuplicateField) if the
    ///   mutation would break a unique constraint
    /// - [`AuthError::Storage`](crate::AuthError::Storage) if the backend fails
    fn update_if_match(
        &self,
        id: UserId,
        command: &UserCommand,
    ) -> impl Future<Output = Result<UpdateOutcome>> + Send;

    /// Delete the record with `id` if its role equals `required_role`.
    ///
    /// Returns the deleted record, or `None` if no record has `id`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ProtectedAccount`](crate::AuthError::ProtectedAccount) if the role differs
    /// - [`AuthError::Storage`](crate::AuthError::Storage) if the backend fails
    fn delete_if_role(
        &self,
        id: UserId,
        required_role: Role,
    ) -> impl Future<Output = Result<Option<User>>> + Send;
}
