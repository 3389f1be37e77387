use sqlx::{Sqlite, SqlitePool};

use crate::{authentication::AuthUser, data_formats::Page, errors::RequestError, models::Rating};

use super::{owner_of, Tx};

const RATING_QUERY: &str = r#"
    SELECT ratings.id         AS "id",
           ratings.recipe_id  AS "recipe_id",
           recipes.title      AS "recipe_title",
           ratings.user_id    AS "user_id",
           users.username     AS "user_username",
           ratings.score      AS "score",
           ratings.created_at AS "created_at"
    FROM   ratings
           JOIN recipes
             ON recipes.id = ratings.recipe_id
           JOIN users
             ON users.id = ratings.user_id
"#;

pub async fn list_ratings_in_db(
    pool: &SqlitePool,
    recipe_id: Option<i64>,
    page: &Page,
) -> Result<(Vec<Rating>, i64), RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT COUNT(*) FROM ratings WHERE $1 IS NULL OR recipe_id = $1",
    )
    .bind(recipe_id)
    .fetch_one(pool)
    .await?;
    let result = sqlx::query_as::<Sqlite, Rating>(&format!(
        r#"{RATING_QUERY}
        WHERE  $1 IS NULL OR ratings.recipe_id = $1
        ORDER  BY ratings.created_at DESC, ratings.id DESC
        LIMIT  $2 OFFSET $3"#
    ))
    .bind(recipe_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok((result, count))
}

pub async fn get_ratings_for_recipe_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
) -> Result<Vec<Rating>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Rating>(&format!(
        r#"{RATING_QUERY}
        WHERE  ratings.recipe_id = $1
        ORDER  BY ratings.created_at DESC, ratings.id DESC"#
    ))
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;
    Ok(result)
}

pub async fn get_rating_in_db(pool: &SqlitePool, id: i64) -> Result<Rating, RequestError> {
    sqlx::query_as::<Sqlite, Rating>(&format!("{RATING_QUERY} WHERE ratings.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(RequestError::NotFound("Rating not found"))
}

async fn rating_by_id(tx: &mut Tx<'_>, id: i64) -> Result<Rating, RequestError> {
    sqlx::query_as::<Sqlite, Rating>(&format!("{RATING_QUERY} WHERE ratings.id = $1"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RequestError::NotFound("Rating not found"))
}

/// Creates the user's rating for the recipe or overwrites its score, in one
/// statement so concurrent submissions cannot produce two rows. The flag is
/// `true` when a new row was inserted.
pub async fn upsert_rating_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
    user_id: i64,
    score: i64,
) -> Result<(Rating, bool), RequestError> {
    let mut tx = pool.begin().await?;
    let (rating_id, created) = sqlx::query_as::<Sqlite, (i64, bool)>(
        r#"
        INSERT INTO ratings (recipe_id, user_id, score)
        VALUES ($1, $2, $3)
        ON CONFLICT (recipe_id, user_id)
        DO UPDATE SET score = excluded.score, updated_at = CURRENT_TIMESTAMP
        RETURNING id, updated_at IS NULL
        "#,
    )
    .bind(recipe_id)
    .bind(user_id)
    .bind(score)
    .fetch_one(&mut tx)
    .await?;
    let rating = rating_by_id(&mut tx, rating_id).await?;
    tx.commit().await?;
    tracing::debug!(recipe_id, user_id, score, created, "rating stored");
    Ok((rating, created))
}

pub async fn update_rating_in_db(
    pool: &SqlitePool,
    rating_id: i64,
    user: &AuthUser,
    score: i64,
) -> Result<Rating, RequestError> {
    let mut tx = pool.begin().await?;
    let owner = owner_of(
        &mut tx,
        "SELECT user_id FROM ratings WHERE id = $1",
        rating_id,
        "Rating not found",
    )
    .await?;
    user.ensure_owns(owner, "Only the rating author can update this rating.")?;

    sqlx::query(
        r#"
        UPDATE ratings
        SET    score = $1, updated_at = CURRENT_TIMESTAMP
        WHERE  id = $2 AND user_id = $3
        "#,
    )
    .bind(score)
    .bind(rating_id)
    .bind(user.id)
    .execute(&mut tx)
    .await?;
    let rating = rating_by_id(&mut tx, rating_id).await?;
    tx.commit().await?;
    Ok(rating)
}

pub async fn delete_rating_in_db(
    pool: &SqlitePool,
    rating_id: i64,
    user: &AuthUser,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let owner = owner_of(
        &mut tx,
        "SELECT user_id FROM ratings WHERE id = $1",
        rating_id,
        "Rating not found",
    )
    .await?;
    user.ensure_owns(owner, "Only the rating author can delete this rating.")?;

    sqlx::query("DELETE FROM ratings WHERE id = $1 AND user_id = $2")
        .bind(rating_id)
        .bind(user.id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
