use sqlx::{Sqlite, SqlitePool};

use crate::{authentication::AuthUser, data_formats::Page, errors::RequestError, models::Comment};

use super::{owner_of, Tx};

const COMMENT_QUERY: &str = r#"
    SELECT comments.id          AS "id",
           comments.recipe_id   AS "recipe_id",
           recipes.title        AS "recipe_title",
           comments.user_id     AS "user_id",
           users.username       AS "user_username",
           comments.text        AS "text",
           comments.likes_count AS "likes_count",
           comments.created_at  AS "created_at",
           comments.updated_at  AS "updated_at"
    FROM   comments
           JOIN recipes
             ON recipes.id = comments.recipe_id
           JOIN users
             ON users.id = comments.user_id
"#;

pub async fn list_comments_in_db(
    pool: &SqlitePool,
    recipe_id: Option<i64>,
    page: &Page,
) -> Result<(Vec<Comment>, i64), RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>(
        "SELECT COUNT(*) FROM comments WHERE $1 IS NULL OR recipe_id = $1",
    )
    .bind(recipe_id)
    .fetch_one(pool)
    .await?;
    let result = sqlx::query_as::<Sqlite, Comment>(&format!(
        r#"{COMMENT_QUERY}
        WHERE  $1 IS NULL OR comments.recipe_id = $1
        ORDER  BY comments.created_at DESC, comments.id DESC
        LIMIT  $2 OFFSET $3"#
    ))
    .bind(recipe_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok((result, count))
}

/// All comments on a recipe, newest first.
pub async fn get_comments_for_recipe_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
) -> Result<Vec<Comment>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Comment>(&format!(
        r#"{COMMENT_QUERY}
        WHERE  comments.recipe_id = $1
        ORDER  BY comments.created_at DESC, comments.id DESC"#
    ))
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;
    Ok(result)
}

pub async fn get_comment_in_db(pool: &SqlitePool, id: i64) -> Result<Comment, RequestError> {
    sqlx::query_as::<Sqlite, Comment>(&format!("{COMMENT_QUERY} WHERE comments.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(RequestError::NotFound("Comment not found"))
}

async fn comment_by_id(tx: &mut Tx<'_>, id: i64) -> Result<Comment, RequestError> {
    sqlx::query_as::<Sqlite, Comment>(&format!("{COMMENT_QUERY} WHERE comments.id = $1"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RequestError::NotFound("Comment not found"))
}

pub async fn add_comment_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
    user_id: i64,
    text: &str,
) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;
    let comment_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO comments (recipe_id, user_id, text)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(recipe_id)
    .bind(user_id)
    .bind(text.trim())
    .fetch_one(&mut tx)
    .await?;
    let comment = comment_by_id(&mut tx, comment_id).await?;
    tx.commit().await?;
    Ok(comment)
}

pub async fn update_comment_in_db(
    pool: &SqlitePool,
    comment_id: i64,
    user: &AuthUser,
    text: &str,
) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;
    let owner = owner_of(
        &mut tx,
        "SELECT user_id FROM comments WHERE id = $1",
        comment_id,
        "Comment not found",
    )
    .await?;
    user.ensure_owns(owner, "Only the comment author can update this comment.")?;

    sqlx::query(
        r#"
        UPDATE comments
        SET    text = $1, updated_at = CURRENT_TIMESTAMP
        WHERE  id = $2 AND user_id = $3
        "#,
    )
    .bind(text.trim())
    .bind(comment_id)
    .bind(user.id)
    .execute(&mut tx)
    .await?;
    let comment = comment_by_id(&mut tx, comment_id).await?;
    tx.commit().await?;
    Ok(comment)
}

pub async fn delete_comment_in_db(
    pool: &SqlitePool,
    comment_id: i64,
    user: &AuthUser,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let owner = owner_of(
        &mut tx,
        "SELECT user_id FROM comments WHERE id = $1",
        comment_id,
        "Comment not found",
    )
    .await?;
    user.ensure_owns(owner, "Only the comment author can delete this comment.")?;

    sqlx::query("DELETE FROM comments WHERE id = $1 AND user_id = $2")
        .bind(comment_id)
        .bind(user.id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::{create_recipe_in_db, test_support::*};

    #[tokio::test]
    async fn only_the_author_edits_a_comment() {
        let pool = test_pool().await;
        let chef = create_user(&pool, "chef_mario").await;
        let cook = create_user(&pool, "cook_sarah").await;
        let recipe_id = create_recipe_in_db(&pool, chef, recipe_request("Carbonara", None))
            .await
            .unwrap();
        let comment = add_comment_in_db(&pool, recipe_id, cook, " Delicious! ")
            .await
            .unwrap();
        assert_eq!(comment.text, "Delicious!");
        assert_eq!(comment.recipe_title, "Carbonara");
        assert_eq!(comment.user_username, "cook_sarah");

        let intruder = AuthUser {
            id: chef,
            username: "chef_mario".into(),
            token: String::new(),
        };
        assert!(matches!(
            update_comment_in_db(&pool, comment.id, &intruder, "Meh").await,
            Err(RequestError::Forbidden(_))
        ));
        assert!(matches!(
            delete_comment_in_db(&pool, comment.id, &intruder).await,
            Err(RequestError::Forbidden(_))
        ));

        let owner = AuthUser {
            id: cook,
            username: "cook_sarah".into(),
            token: String::new(),
        };
        let updated = update_comment_in_db(&pool, comment.id, &owner, "Even better reheated")
            .await
            .unwrap();
        assert_eq!(updated.text, "Even better reheated");
        delete_comment_in_db(&pool, comment.id, &owner).await.unwrap();
        assert!(matches!(
            get_comment_in_db(&pool, comment.id).await,
            Err(RequestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn new_comments_read_back_on_a_multi_connection_pool() {
        let pool = shared_pool("comments").await;
        let chef = create_user(&pool, "chef_mario").await;
        let recipe_id = create_recipe_in_db(&pool, chef, recipe_request("Carbonara", None))
            .await
            .unwrap();
        for i in 0..10 {
            let cook = create_user(&pool, &format!("cook{i}")).await;
            let comment = add_comment_in_db(&pool, recipe_id, cook, &format!("Try {i}"))
                .await
                .unwrap();
            assert_eq!(comment.user_id, cook);
            assert_eq!(comment.text, format!("Try {i}"));
        }
        assert_eq!(get_comments_for_recipe_in_db(&pool, recipe_id).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn missing_comment_is_not_found() {
        let pool = test_pool().await;
        let user = AuthUser {
            id: 1,
            username: "nobody".into(),
            token: String::new(),
        };
        assert!(matches!(
            delete_comment_in_db(&pool, 404, &user).await,
            Err(RequestError::NotFound(_))
        ));
    }
}
