//! User operations

use chrono::Utc;
use sqlx::Row;

use super::roles::{fetch_role_names, link_roles};
use crate::error::DbError;
use crate::models::{NewUser, User};
use crate::repository::Database;

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user together with its role assignments
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            // The UNIQUE constraint is the only duplicate check, so
            // concurrent inserts cannot both pass it
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DbError::Duplicate {
                entity: "User",
                key: user.username.clone(),
            },
            other => DbError::from(other),
        })?;

        let id: i64 = result.get("id");
        link_roles(&mut tx, id, &user.roles).await?;
        let roles = fetch_role_names(&mut tx, id).await?;

        tx.commit().await?;

        Ok(User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            roles,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a user by username, roles included
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, created_at, updated_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut user = User::try_from(&row)?;
        user.roles = fetch_role_names(&mut conn, user.id).await?;
        Ok(Some(user))
    }

    /// Get a user by ID, roles included
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut user = User::try_from(&row)?;
        user.roles = fetch_role_names(&mut conn, user.id).await?;
        Ok(Some(user))
    }

    /// List all users
    pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, username, password_hash, created_at, updated_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut user = User::try_from(row)?;
            user.roles = fetch_role_names(&mut conn, user.id).await?;
            users.push(user);
        }
        Ok(users)
    }

    /// Delete a user
    pub async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if any users exist
    pub async fn has_users(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}
