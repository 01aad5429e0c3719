//! Role operations

use sqlx::{Row, SqliteConnection};

use crate::error::DbError;
use crate::models::Role;
use crate::repository::Database;

impl Database {
    // ==================== Role Operations ====================

    /// List all roles
    pub async fn list_roles(&self) -> Result<Vec<Role>, DbError> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Role::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Get the role names assigned to a user
    pub async fn get_user_roles(&self, user_id: i64) -> Result<Vec<String>, DbError> {
        let mut conn = self.pool.acquire().await?;
        fetch_role_names(&mut conn, user_id).await
    }

    /// Replace the full role set of a user
    pub async fn set_user_roles(&self, user_id: i64, roles: &[String]) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        link_roles(&mut tx, user_id, roles).await?;

        tx.commit().await?;
        Ok(true)
    }
}

/// Insert the role if missing and return its id
pub(crate) async fn ensure_role_id(conn: &mut SqliteConnection, name: &str) -> Result<i64, DbError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(DbError::InvalidRole(name.to_string()));
    }

    sqlx::query("INSERT OR IGNORE INTO roles (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let row = sqlx::query("SELECT id FROM roles WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.get("id"))
}

/// Attach roles to a user, creating missing roles on the way
pub(crate) async fn link_roles(
    conn: &mut SqliteConnection,
    user_id: i64,
    roles: &[String],
) -> Result<(), DbError> {
    for name in roles {
        let role_id = ensure_role_id(conn, name).await?;
        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) async fn fetch_role_names(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query(
        r#"
        SELECT r.name
        FROM roles r
        JOIN user_roles ur ON ur.role_id = r.id
        WHERE ur.user_id = ?
        ORDER BY r.name
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(|row| row.get("name")).collect())
}
