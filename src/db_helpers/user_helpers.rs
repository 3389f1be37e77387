use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::RegisterRequest, errors::RequestError, models::User};

const USER_QUERY: &str = "SELECT id, username, email, password, created_at FROM users";

/// Inserts the account and its empty profile together. `user.password` must
/// already be hashed.
pub async fn insert_user(pool: &SqlitePool, user: &RegisterRequest) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query_as::<Sqlite, User>(
        r#"
        INSERT INTO users (username, email, password)
        VALUES ($1, $2, $3)
        RETURNING id, username, email, password, created_at
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password)
    .fetch_one(&mut tx)
    .await
    .map_err(RequestError::from)
    .map_err(|e| {
        if e.is_unique_violation() {
            RequestError::invalid_field("username", "A user with that username already exists.")
        } else {
            e
        }
    })?;

    sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
        .bind(result.id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let result = sqlx::query_as::<Sqlite, User>(&format!("{USER_QUERY} WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let result = sqlx::query_as::<Sqlite, User>(&format!("{USER_QUERY} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}
