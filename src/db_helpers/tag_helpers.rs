use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::Page, errors::RequestError, models::Tag};

use super::{invalid_pk, Tx};

const TAG_QUERY: &str = "SELECT id, name, created_at FROM tags";

pub async fn list_tags_in_db(
    pool: &SqlitePool,
    page: &Page,
) -> Result<(Vec<Tag>, i64), RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM tags")
        .fetch_one(pool)
        .await?;
    let result = sqlx::query_as::<Sqlite, Tag>(&format!(
        "{TAG_QUERY} ORDER BY name, id LIMIT $1 OFFSET $2"
    ))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok((result, count))
}

pub async fn get_all_tags_in_db(pool: &SqlitePool) -> Result<Vec<Tag>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Tag>(&format!("{TAG_QUERY} ORDER BY name"))
        .fetch_all(pool)
        .await?;
    Ok(result)
}

pub async fn get_tag_in_db(pool: &SqlitePool, id: i64) -> Result<Tag, RequestError> {
    sqlx::query_as::<Sqlite, Tag>(&format!("{TAG_QUERY} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(RequestError::NotFound("Tag not found"))
}

pub async fn create_tag_in_db(pool: &SqlitePool, name: &str) -> Result<Tag, RequestError> {
    let mut tx = pool.begin().await?;
    let tag = sqlx::query_as::<Sqlite, Tag>(
        r#"
        INSERT INTO tags (name)
        VALUES ($1)
        RETURNING id, name, created_at
        "#,
    )
    .bind(name.trim())
    .fetch_one(&mut tx)
    .await
    .map_err(|e| {
        let e = RequestError::from(e);
        if e.is_unique_violation() {
            RequestError::invalid_field("name", "tag with this name already exists.")
        } else {
            e
        }
    })?;
    tx.commit().await?;
    Ok(tag)
}

/// Resolves tag names to ids, creating the ones that do not exist yet.
pub async fn get_or_create_tags_in_db(
    pool: &SqlitePool,
    names: &[String],
) -> Result<Vec<i64>, RequestError> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(names.len());
    for name in names.iter().map(|name| name.trim()).filter(|name| !name.is_empty()) {
        let tag_id = sqlx::query_scalar::<Sqlite, i64>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&mut tx)
        .await?;
        if !ids.contains(&tag_id) {
            ids.push(tag_id);
        }
    }
    tx.commit().await?;
    Ok(ids)
}

pub async fn get_tags_for_recipe_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
) -> Result<Vec<Tag>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Tag>(
        r#"
        SELECT tags.id, tags.name, tags.created_at
        FROM   tags
               JOIN recipe_tags ON recipe_tags.tag_id = tags.id
        WHERE  recipe_tags.recipe_id = $1
        ORDER  BY tags.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;
    Ok(result)
}

/// Replaces the recipe's tag set. Unknown ids are a field error on `tag_ids`.
pub(crate) async fn set_recipe_tags(
    tx: &mut Tx<'_>,
    recipe_id: i64,
    tag_ids: &[i64],
) -> Result<(), RequestError> {
    for &tag_id in tag_ids {
        let exists =
            sqlx::query_scalar::<Sqlite, bool>("SELECT EXISTS (SELECT 1 FROM tags WHERE id = $1)")
                .bind(tag_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(invalid_pk("tag_ids", tag_id));
        }
    }
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    for &tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
    }
    Ok(())
}
