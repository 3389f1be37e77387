use sqlx::{Sqlite, SqlitePool};

use crate::{
    data_formats::{CategoryRequest, Page, UpdateCategoryRequest},
    errors::RequestError,
    models::Category,
};

const CATEGORY_QUERY: &str = "SELECT id, name, description, created_at FROM categories";

fn map_duplicate_name(error: sqlx::Error) -> RequestError {
    let error = RequestError::from(error);
    if error.is_unique_violation() {
        RequestError::invalid_field("name", "category with this name already exists.")
    } else {
        error
    }
}

pub async fn list_categories_in_db(
    pool: &SqlitePool,
    page: &Page,
) -> Result<(Vec<Category>, i64), RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    let result = sqlx::query_as::<Sqlite, Category>(&format!(
        "{CATEGORY_QUERY} ORDER BY name, id LIMIT $1 OFFSET $2"
    ))
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok((result, count))
}

pub async fn get_all_categories_in_db(pool: &SqlitePool) -> Result<Vec<Category>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Category>(&format!("{CATEGORY_QUERY} ORDER BY name"))
        .fetch_all(pool)
        .await?;
    Ok(result)
}

pub async fn get_category_in_db(pool: &SqlitePool, id: i64) -> Result<Category, RequestError> {
    sqlx::query_as::<Sqlite, Category>(&format!("{CATEGORY_QUERY} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(RequestError::NotFound("Category not found"))
}

pub async fn create_category_in_db(
    pool: &SqlitePool,
    CategoryRequest { name, description }: CategoryRequest,
) -> Result<Category, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query_as::<Sqlite, Category>(
        r#"
        INSERT INTO categories (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description, created_at
        "#,
    )
    .bind(name.trim())
    .bind(description)
    .fetch_one(&mut tx)
    .await
    .map_err(map_duplicate_name)?;
    tx.commit().await?;
    Ok(result)
}

/// Overwrites both columns; a missing description is stored as NULL.
pub async fn replace_category_in_db(
    pool: &SqlitePool,
    id: i64,
    CategoryRequest { name, description }: CategoryRequest,
) -> Result<Category, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query_as::<Sqlite, Category>(
        r#"
        UPDATE categories
        SET    name = $1,
               description = $2
        WHERE  id = $3
        RETURNING id, name, description, created_at
        "#,
    )
    .bind(name.trim())
    .bind(description)
    .bind(id)
    .fetch_optional(&mut tx)
    .await
    .map_err(map_duplicate_name)?;
    tx.commit().await?;
    result.ok_or(RequestError::NotFound("Category not found"))
}

pub async fn update_category_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdateCategoryRequest { name, description }: UpdateCategoryRequest,
) -> Result<Category, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query_as::<Sqlite, Category>(
        r#"
        UPDATE categories
        SET    name = COALESCE($1, name),
               description = COALESCE($2, description)
        WHERE  id = $3
        RETURNING id, name, description, created_at
        "#,
    )
    .bind(name.as_deref().map(str::trim))
    .bind(description)
    .bind(id)
    .fetch_optional(&mut tx)
    .await
    .map_err(map_duplicate_name)?;
    tx.commit().await?;
    result.ok_or(RequestError::NotFound("Category not found"))
}

/// Recipes in the category survive with their category cleared.
pub async fn delete_category_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("Category not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::{create_recipe_in_db, get_recipe_in_db, test_support::*};

    #[tokio::test]
    async fn deleting_category_nulls_recipe_category() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let category = create_category_in_db(
            &pool,
            CategoryRequest {
                name: "Italian".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let recipe_id =
            create_recipe_in_db(&pool, author, recipe_request("Carbonara", Some(category.id)))
                .await
                .unwrap();

        delete_category_in_db(&pool, category.id).await.unwrap();

        let recipe = get_recipe_in_db(&pool, recipe_id, None).await.unwrap().unwrap();
        assert_eq!(recipe.category_id, None);
        assert_eq!(recipe.category_name, None);
        assert!(matches!(
            get_category_in_db(&pool, category.id).await,
            Err(RequestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn category_names_are_unique() {
        let pool = test_pool().await;
        let request = || CategoryRequest {
            name: "Desserts".into(),
            description: Some("Sweet things".into()),
        };
        create_category_in_db(&pool, request()).await.unwrap();
        let error = create_category_in_db(&pool, request()).await.unwrap_err();
        assert!(matches!(error, RequestError::Validation(ref f) if f.contains_key("name")));
    }

    #[tokio::test]
    async fn patch_keeps_absent_fields() {
        let pool = test_pool().await;
        let category = create_category_in_db(
            &pool,
            CategoryRequest {
                name: "Mexican".into(),
                description: Some("Spicy".into()),
            },
        )
        .await
        .unwrap();
        let updated = update_category_in_db(
            &pool,
            category.id,
            UpdateCategoryRequest {
                name: Some("Tex-Mex".into()),
                description: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Tex-Mex");
        assert_eq!(updated.description.as_deref(), Some("Spicy"));
    }

    #[tokio::test]
    async fn replace_clears_missing_description() {
        let pool = test_pool().await;
        let category = create_category_in_db(
            &pool,
            CategoryRequest {
                name: "Mexican".into(),
                description: Some("Spicy".into()),
            },
        )
        .await
        .unwrap();
        let replaced = replace_category_in_db(
            &pool,
            category.id,
            CategoryRequest {
                name: "Tex-Mex".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(replaced.name, "Tex-Mex");
        assert_eq!(replaced.description, None);
        assert!(matches!(
            replace_category_in_db(
                &pool,
                999,
                CategoryRequest {
                    name: "Ghost".into(),
                    description: None,
                },
            )
            .await,
            Err(RequestError::NotFound(_))
        ));
    }
}
