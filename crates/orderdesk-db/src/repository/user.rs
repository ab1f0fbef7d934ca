//! # User Repository
//!
//! Login accounts and the per-profile screen allow-list.
//!
//! ## Sign-in Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         authenticate()                                  │
//! │                                                                         │
//! │  find_by_email ──► none / inactive / wrong password ──► Ok(None)       │
//! │       │            (each path runs one argon2 verification)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  role == Admin ? every known screen : profile_screens rows             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SessionContext::signed_in(...)  (stored by the web layer)             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! E-mails are stored trimmed and lower-cased; lookups normalize the same way.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use orderdesk_core::credentials::{
    hash_password, validate_new_password, verify_password, verify_unknown_account,
};
use orderdesk_core::validation::{validate_email, validate_user_name};
use orderdesk_core::{Resource, Role, SessionContext, User};

const USER_COLUMNS: &str = r#"
    id,
    name,
    email,
    password_hash,
    profile_id,
    active,
    created_at
"#;

// =============================================================================
// Inputs
// =============================================================================

/// A new account as posted by the user registration screen.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub role: Role,
}

/// Outcome of [`UserRepository::ensure_admin`].
#[derive(Debug, Clone)]
pub enum AdminAccount {
    /// No account had the e-mail; a new administrator was stored.
    Created(User),
    /// An active administrator with the e-mail already exists.
    Present(User),
    /// The e-mail belongs to an account that is inactive or not an
    /// administrator. It is left unchanged.
    Unusable(User),
}

/// Editable account fields. The password has its own operation.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user and screen allow-list operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Validates, hashes and stores a new active account.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a bad name, e-mail or password
    /// - `UniqueViolation` when the e-mail is taken
    pub async fn create(&self, new_user: NewUser) -> DbResult<User> {
        validate_user_name(&new_user.name)?;
        validate_email(&new_user.email)?;
        validate_new_password(&new_user.password, &new_user.password_confirmation)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new_user.name.trim().to_string(),
            email: normalize_email(&new_user.email),
            password_hash: hash_password(&new_user.password)?,
            profile_id: new_user.role.profile_id(),
            active: true,
            created_at: Utc::now(),
        };

        debug!(id = %user.id, role = %new_user.role, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, profile_id, active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.profile_id)
        .bind(user.active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &user.email))?;

        Ok(user)
    }

    /// Makes sure an active administrator owns `admin.email`.
    ///
    /// Creates the account when the e-mail is free. An existing account is
    /// never modified, whatever its role or state.
    pub async fn ensure_admin(&self, admin: NewUser) -> DbResult<AdminAccount> {
        match self.find_by_email(&admin.email).await? {
            Some(existing) if existing.active && existing.role() == Some(Role::Admin) => {
                Ok(AdminAccount::Present(existing))
            }
            Some(existing) => Ok(AdminAccount::Unusable(existing)),
            None => {
                let created = self
                    .create(NewUser {
                        role: Role::Admin,
                        ..admin
                    })
                    .await?;
                Ok(AdminAccount::Created(created))
            }
        }
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by login e-mail, in any casing.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// All accounts ordered by name.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name, email");

        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Number of accounts, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Checks credentials and builds the session for the web layer.
    ///
    /// Unknown e-mails, inactive accounts and wrong passwords all return
    /// `Ok(None)` after the same argon2 work, so the caller cannot tell them
    /// apart by result or by timing.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> DbResult<Option<SessionContext>> {
        let Some(user) = self.find_by_email(email).await? else {
            verify_unknown_account(password);
            warn!("Sign-in rejected: unknown e-mail");
            return Ok(None);
        };

        let password_ok = verify_password(password, &user.password_hash);

        if !user.active {
            warn!(user_id = %user.id, "Sign-in rejected: inactive account");
            return Ok(None);
        }

        if !password_ok {
            warn!(user_id = %user.id, "Sign-in rejected: wrong password");
            return Ok(None);
        }

        let screens = match user.role() {
            Some(Role::Admin) => Resource::KNOWN.iter().map(|name| Resource::new(name)).collect(),
            _ => self.screens_for_profile(user.profile_id).await?,
        };

        info!(user_id = %user.id, profile_id = user.profile_id, "User signed in");

        Ok(Some(SessionContext::signed_in(
            user.id,
            user.name,
            user.profile_id,
            screens,
        )))
    }

    /// Updates name, e-mail, role and active flag.
    pub async fn update(&self, id: &str, changes: UserUpdate) -> DbResult<()> {
        validate_user_name(&changes.name)?;
        validate_email(&changes.email)?;

        let email = normalize_email(&changes.email);

        debug!(id = %id, role = %changes.role, active = changes.active, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = ?2,
                email = ?3,
                profile_id = ?4,
                active = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(changes.name.trim())
        .bind(&email)
        .bind(changes.role.profile_id())
        .bind(changes.active)
        .execute(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &email))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    /// Replaces a user's password after checking the confirmation.
    pub async fn change_password(
        &self,
        id: &str,
        password: &str,
        confirmation: &str,
    ) -> DbResult<()> {
        validate_new_password(password, confirmation)?;
        let password_hash = hash_password(password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(&password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// Enables or disables sign-in for an account.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        debug!(user_id = %id, active, "User active flag set");
        Ok(())
    }

    /// Deletes an account.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Screens listed for a profile, in name order.
    pub async fn screens_for_profile(&self, profile_id: i64) -> DbResult<Vec<Resource>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT screen FROM profile_screens WHERE profile_id = ?1 ORDER BY screen",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().map(Resource::from).collect())
    }

    /// Adds a screen to a profile's allow-list. Granting twice is a no-op.
    pub async fn grant_screen(&self, profile_id: i64, screen: &Resource) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO profile_screens (profile_id, screen) VALUES (?1, ?2)")
            .bind(profile_id)
            .bind(screen.as_str())
            .execute(&self.pool)
            .await?;

        debug!(profile_id, screen = %screen, "Screen granted");
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Turns the generic UNIQUE error into one naming the e-mail.
fn email_conflict(err: sqlx::Error, email: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
