//! PostgreSQL credential store implementation.
//!
//! Conditional updates run inside a transaction that locks the row with
//! `SELECT ... FOR UPDATE`, evaluates the command's guard in Rust, and writes
//! the result back before committing. Unique constraints on `username` and
//! `email` close the race between an existence check and an insert/update.
//!
//! # Example
//!
//! ```no_run
//! use warden_identity::stores::postgres::PostgresCredentialStore;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/identity").await?;
//! let store = PostgresCredentialStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::commands::{UpdateOutcome, UserCommand};
use crate::error::{AuthError, Result};
use crate::providers::CredentialStore;
use crate::state::{AuthType, Authentication, Avatar, Role, User, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const COLUMNS: &str = "id, name, username, email, avatar_url, avatar_asset_id, \
     password_hash, role, auth_type, is_account_confirmed, confirmation_token, \
     reset_password_token, change_email_token, pending_email, refresh_token, \
     is_banned, created_at, updated_at";

/// Row shape of the `users` table.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: uuid::Uuid,
    name: String,
    username: String,
    email: String,
    avatar_url: Option<String>,
    avatar_asset_id: Option<String>,
    password_hash: Option<String>,
    role: String,
    auth_type: String,
    is_account_confirmed: bool,
    confirmation_token: Option<String>,
    reset_password_token: Option<String>,
    change_email_token: Option<String>,
    pending_email: Option<String>,
    refresh_token: Option<String>,
    is_banned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: UserId(row.id),
            name: row.name,
            username: row.username,
            email: row.email,
            avatar: row.avatar_url.map(|url| Avatar {
                url,
                asset_id: row.avatar_asset_id,
            }),
            authentication: Authentication {
                password_hash: row.password_hash,
                role: Role::parse(&row.role).map_err(AuthError::Storage)?,
                auth_type: AuthType::parse(&row.auth_type).map_err(AuthError::Storage)?,
                is_account_confirmed: row.is_account_confirmed,
                confirmation_token: row.confirmation_token,
                reset_password_token: row.reset_password_token,
                change_email_token: row.change_email_token,
                pending_email: row.pending_email,
                refresh_token: row.refresh_token,
            },
            is_banned: row.is_banned,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL credential store.
#[derive(Clone)]
pub struct PostgresCredentialStore {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresCredentialStore {
    /// Create a new PostgreSQL credential store.
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE {column} = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to get user: {e}")))?
            .map(User::try_from)
            .transpose()
    }
}

/// Map a unique violation to the field that collided.
fn map_write_error(e: sqlx::Error, email_error: AuthError) -> AuthError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => email_error,
                _ => AuthError::DuplicateField { field: "username" },
            };
        }
    }
    AuthError::Storage(format!("Failed to write user: {e}"))
}

impl CredentialStore for PostgresCredentialStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to get user: {e}")))?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn create_user(&self, user: User) -> Result<User> {
        let auth = &user.authentication;
        let sql = format!(
            "INSERT INTO users ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        );

        sqlx::query(&sql)
            .bind(user.id.0)
            .bind(&user.name)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.avatar.as_ref().map(|a| a.url.clone()))
            .bind(user.avatar.as_ref().and_then(|a| a.asset_id.clone()))
            .bind(&auth.password_hash)
            .bind(auth.role.as_str())
            .bind(auth.auth_type.as_str())
            .bind(auth.is_account_confirmed)
            .bind(&auth.confirmation_token)
            .bind(&auth.reset_password_token)
            .bind(&auth.change_email_token)
            .bind(&auth.pending_email)
            .bind(&auth.refresh_token)
            .bind(user.is_banned)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, AuthError::DuplicateField { field: "email" }))?;

        Ok(user)
    }

    async fn update_if_match(&self, id: UserId, command: &UserCommand) -> Result<UpdateOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to begin transaction: {e}")))?;

        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let previous: User = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to lock user: {e}")))?
            .ok_or(AuthError::UserNotFound)?
            .try_into()?;

        let mut current = previous.clone();
        if let Err(rejection) = command.apply(&mut current, Utc::now()) {
            // Dropping the transaction rolls it back and releases the row lock.
            return Ok(UpdateOutcome::Rejected(rejection));
        }

        let auth = &current.authentication;
        sqlx::query(
            r"
            UPDATE users SET
                name = $2, username = $3, email = $4, avatar_url = $5, avatar_asset_id = $6,
                password_hash = $7, is_account_confirmed = $8, confirmation_token = $9,
                reset_password_token = $10, change_email_token = $11, pending_email = $12,
                refresh_token = $13, is_banned = $14, updated_at = $15
            WHERE id = $1
            ",
        )
        .bind(id.0)
        .bind(&current.name)
        .bind(&current.username)
        .bind(&current.email)
        .bind(current.avatar.as_ref().map(|a| a.url.clone()))
        .bind(current.avatar.as_ref().and_then(|a| a.asset_id.clone()))
        .bind(&auth.password_hash)
        .bind(auth.is_account_confirmed)
        .bind(&auth.confirmation_token)
        .bind(&auth.reset_password_token)
        .bind(&auth.change_email_token)
        .bind(&auth.pending_email)
        .bind(&auth.refresh_token)
        .bind(current.is_banned)
        .bind(current.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, AuthError::EmailInUse))?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to commit: {e}")))?;

        tracing::debug!(user_id = %id, command = command.name(), "Conditional update committed");

        Ok(UpdateOutcome::Applied {
            previous: Box::new(previous),
            current: Box::new(current),
        })
    }

    async fn delete_if_role(&self, id: UserId, required_role: Role) -> Result<Option<User>> {
        let sql = format!("DELETE FROM users WHERE id = $1 AND role = $2 RETURNING {COLUMNS}");
        let deleted = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.0)
            .bind(required_role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Storage(format!("Failed to delete user: {e}")))?;

        match deleted {
            Some(row) => Ok(Some(row.try_into()?)),
            // Nothing deleted: either missing or the role did not match.
            None => match self.find_by_id(id).await? {
                Some(_) => Err(AuthError::ProtectedAccount),
                None => Ok(None),
            },
        }
    }
}
