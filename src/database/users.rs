// ABOUTME: User account database operations: registration, roles, keys and passwords
// ABOUTME: Confirmation and reset keys share one column stamped with its issue time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use std::str::FromStr;

use chrono::{DateTime, Utc};
use recipe_core::errors::{AppError, AppResult};
use recipe_core::permissions::UserRole;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use super::{now_timestamp, parse_timestamp, Database, TransactionGuard};
use crate::models::{NewUser, ProfileUpdate, User, UserUpdate};

impl Database {
    /// Create users and user roles tables
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails
    pub(super) async fn migrate_users(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                email TEXT NOT NULL UNIQUE,
                uuid TEXT,
                key_issued_at TEXT,
                confirmed INTEGER NOT NULL DEFAULT 0,
                notifications INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                role_name TEXT NOT NULL CHECK (role_name IN ('ADMIN', 'CREATOR')),
                PRIMARY KEY (user_id, role_name)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_uuid ON users(uuid)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

const USER_COLUMNS: &str = r"
    u.id, u.username, u.first_name, u.last_name, u.email, u.confirmed, u.notifications,
    u.created_at, u.updated_at,
    (SELECT GROUP_CONCAT(role_name) FROM user_roles WHERE user_id = u.id) AS roles
";

/// User database operations manager
#[derive(Clone)]
pub struct UsersManager {
    pool: SqlitePool,
}

impl UsersManager {
    /// Create a new users manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register an unconfirmed user with roles and a confirmation key
    ///
    /// # Errors
    ///
    /// Returns `UNIQUE_CONSTRAINT_ERROR` for a taken username or email
    #[tracing::instrument(skip(self, user, password_hash, key), fields(username = %user.username))]
    pub async fn create(&self, user: &NewUser, password_hash: &str, key: &str) -> AppResult<i64> {
        let now = now_timestamp();
        let mut guard = TransactionGuard::begin(&self.pool).await?;

        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO users (
                username, password_hash, first_name, last_name, email, uuid, key_issued_at,
                confirmed, notifications, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $7, $7)
            RETURNING id
            ",
        )
        .bind(&user.username)
        .bind(password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(key)
        .bind(&now)
        .bind(user.notifications)
        .fetch_one(guard.executor()?)
        .await?;

        replace_roles(guard.executor()?, id, &user.granted_roles()).await?;
        guard.commit().await?;

        debug!(user_id = id, "User registered");
        Ok(id)
    }

    /// List all users ordered by username
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u ORDER BY u.username"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user does not exist
    pub async fn get(&self, id: i64) -> AppResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(row_to_user)
            .transpose()?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// Find a confirmed user by username together with the password hash
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_credentials(&self, username: &str) -> AppResult<Option<(User, String)>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, u.password_hash FROM users u WHERE u.username = $1 AND u.confirmed = 1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> AppResult<(User, String)> {
            Ok((row_to_user(&row)?, row.try_get("password_hash")?))
        })
        .transpose()
    }

    /// Find a confirmed user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_confirmed(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1 AND u.confirmed = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Find a confirmed user by email
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn find_confirmed_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.email = $1 AND u.confirmed = 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Stored password hash of a user
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user does not exist
    pub async fn password_hash(&self, id: i64) -> AppResult<String> {
        sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// Update account data and replace roles
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user does not exist or a constraint error
    #[tracing::instrument(skip(self, update, password_hash))]
    pub async fn update(
        &self,
        id: i64,
        update: &UserUpdate,
        password_hash: Option<&str>,
    ) -> AppResult<()> {
        let mut guard = TransactionGuard::begin(&self.pool).await?;

        let result = sqlx::query(
            r"
            UPDATE users SET
                username = $2,
                first_name = $3,
                last_name = $4,
                email = $5,
                notifications = $6,
                password_hash = COALESCE($7, password_hash),
                updated_at = $8
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&update.username)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(update.notifications)
        .bind(password_hash)
        .bind(now_timestamp())
        .execute(guard.executor()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }

        replace_roles(guard.executor()?, id, &update.granted_roles()).await?;
        guard.commit().await
    }

    /// Update the caller's own profile
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user does not exist or a constraint error
    pub async fn update_profile(&self, id: i64, profile: &ProfileUpdate) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET first_name = $2, last_name = $3, email = $4, notifications = $5, updated_at = $6
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(profile.notifications)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    /// Replace the password hash
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user does not exist
    pub async fn set_password(&self, id: i64, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, uuid = NULL, key_issued_at = NULL, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    /// Delete a user
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user does not exist, or `CONSTRAINT_FAILED`
    /// while recipes still reference the user
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    /// Redeem a confirmation key
    ///
    /// # Errors
    ///
    /// Returns `INVALID_CREDENTIALS` if no unconfirmed user matches the
    /// username and key
    pub async fn confirm(&self, username: &str, key: &str) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET confirmed = 1, uuid = NULL, key_issued_at = NULL, updated_at = $3
            WHERE username = $1 AND uuid = $2 AND confirmed = 0
            ",
        )
        .bind(username)
        .bind(key)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::invalid_credentials());
        }
        Ok(())
    }

    /// Store a fresh confirmation or reset key
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if the user does not exist
    pub async fn issue_key(&self, id: i64, key: &str) -> AppResult<()> {
        let now = now_timestamp();
        let result = sqlx::query("UPDATE users SET uuid = $2, key_issued_at = $3 WHERE id = $1")
            .bind(id)
            .bind(key)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    /// Find the confirmed user holding a reset key and when the key was issued
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored timestamp is malformed
    pub async fn find_by_key(
        &self,
        username: &str,
        key: &str,
    ) -> AppResult<Option<(i64, DateTime<Utc>)>> {
        let row = sqlx::query(
            "SELECT id, key_issued_at FROM users WHERE username = $1 AND uuid = $2 AND confirmed = 1",
        )
        .bind(username)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: i64 = row.try_get("id")?;
        let issued_at: Option<String> = row.try_get("key_issued_at")?;
        let issued_at = issued_at.as_deref().map(parse_timestamp).transpose()?;
        // A key without issue time is treated as issued at the epoch, so it is already expired.
        Ok(Some((id, issued_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))))
    }

    /// Forget any outstanding key
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    pub async fn clear_key(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET uuid = NULL, key_issued_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Confirmed users who opted in to new-recipe digests
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn notification_recipients(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.notifications = 1 AND u.confirmed = 1 ORDER BY u.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    /// Number of registered users
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn count(&self) -> AppResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }
}

async fn replace_roles(conn: &mut SqliteConnection, user_id: i64, roles: &[UserRole]) -> AppResult<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    for role in roles {
        sqlx::query("INSERT INTO user_roles (user_id, role_name) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    let roles: Option<String> = row.try_get("roles")?;
    let mut roles: Vec<UserRole> = roles
        .unwrap_or_default()
        .split(',')
        .filter(|name| !name.is_empty())
        .filter_map(|name| match UserRole::from_str(name) {
            Ok(role) => Some(role),
            Err(e) => {
                warn!(error = %e, "Ignoring stored role");
                None
            }
        })
        .collect();
    roles.sort_unstable();

    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        confirmed: row.try_get("confirmed")?,
        notifications: row.try_get("notifications")?,
        roles,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
