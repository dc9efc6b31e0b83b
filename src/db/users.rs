//! User stub persistence
//!
//! Identity placeholder only; no authentication flow consumes these yet.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::User;

/// Create a user with a generated id
pub async fn create_user(pool: &SqlitePool, username: &str, password: &str) -> Result<User> {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password: password.to_string(),
    };

    sqlx::query("INSERT INTO users (id, username, password) VALUES (?, ?, ?)")
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.password)
        .execute(pool)
        .await?;

    Ok(user)
}

/// Look up a user by id
pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, username, password FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| {
        let id: String = r.get("id");
        let id = Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("Invalid id: {}", e)))?;
        Ok(User {
            id,
            username: r.get("username"),
            password: r.get("password"),
        })
    })
    .transpose()
}

/// Look up a user by username
pub async fn get_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, username, password FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    row.map(|r| {
        let id: String = r.get("id");
        let id = Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("Invalid id: {}", e)))?;
        Ok(User {
            id,
            username: r.get("username"),
            password: r.get("password"),
        })
    })
    .transpose()
}
