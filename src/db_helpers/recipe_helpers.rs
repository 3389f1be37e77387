use sqlx::{Sqlite, SqlitePool};

use crate::{
    authentication::AuthUser,
    data_formats::{Page, RecipeRequest, UpdateRecipeRequest},
    errors::RequestError,
    models::{Difficulty, Recipe},
};

use super::{invalid_pk, owner_of, set_recipe_tags, Tx};

const RECIPE_QUERY: &str = r#"
    SELECT recipes.id                                    AS "id",
           recipes.author_id                             AS "author_id",
           users.username                                AS "author_username",
           recipes.category_id                           AS "category_id",
           categories.name                               AS "category_name",
           recipes.title                                 AS "title",
           recipes.description                           AS "description",
           recipes.ingredients                           AS "ingredients",
           recipes.instructions                          AS "instructions",
           recipes.prep_time                             AS "prep_time",
           recipes.cook_time                             AS "cook_time",
           recipes.servings                              AS "servings",
           recipes.difficulty                            AS "difficulty",
           recipes.image                                 AS "image",
           recipes.published                             AS "published",
           recipes.views_count                           AS "views_count",
           recipes.likes_count                           AS "likes_count",
           recipes.created_at                            AS "created_at",
           recipes.updated_at                            AS "updated_at",
           (SELECT Group_concat(ratings.score, ',')
            FROM   ratings
            WHERE  ratings.recipe_id = recipes.id)       AS "rating_scores",
           (SELECT Count(*)
            FROM   comments
            WHERE  comments.recipe_id = recipes.id)      AS "comments_count"
    FROM   recipes
           JOIN users
             ON users.id = recipes.author_id
           LEFT JOIN categories
                  ON categories.id = recipes.category_id
"#;

// $1 is the viewer: unpublished recipes are only visible to their author.
const RECIPE_FILTER: &str = r#"
    WHERE  ( recipes.published = 1
              OR recipes.author_id = $1 )
       AND ( $2 IS NULL
              OR Instr(Lower(recipes.title), Lower($2)) > 0
              OR Instr(Lower(recipes.description), Lower($2)) > 0
              OR Instr(Lower(recipes.ingredients), Lower($2)) > 0
              OR Instr(Lower(recipes.instructions), Lower($2)) > 0 )
       AND ( $3 IS NULL
              OR recipes.category_id = $3 )
       AND ( $4 IS NULL
              OR recipes.difficulty = $4 )
       AND ( $5 IS NULL
              OR users.username = $5 )
       AND ( $6 IS NULL
              OR EXISTS (SELECT 1
                         FROM   recipe_tags
                         WHERE  recipe_tags.recipe_id = recipes.id
                                AND recipe_tags.tag_id = $6) )
"#;

#[derive(Debug, Default, Clone)]
pub struct RecipeFilter {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub author: Option<String>,
}

/// Whitelisted sort orders for recipe lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeOrdering {
    #[default]
    Newest,
    Oldest,
    MostViewed,
    LeastViewed,
    MostLiked,
    LeastLiked,
    TitleAsc,
    TitleDesc,
}

impl RecipeOrdering {
    pub fn parse(value: Option<&str>) -> Result<Self, RequestError> {
        let ordering = match value.unwrap_or("-created_at") {
            "-created_at" => RecipeOrdering::Newest,
            "created_at" => RecipeOrdering::Oldest,
            "-views_count" => RecipeOrdering::MostViewed,
            "views_count" => RecipeOrdering::LeastViewed,
            "-likes_count" => RecipeOrdering::MostLiked,
            "likes_count" => RecipeOrdering::LeastLiked,
            "title" => RecipeOrdering::TitleAsc,
            "-title" => RecipeOrdering::TitleDesc,
            _ => {
                return Err(RequestError::invalid_field(
                    "ordering",
                    "Ordering must be one of created_at, views_count, likes_count or title, optionally prefixed with '-'.",
                ))
            }
        };
        Ok(ordering)
    }

    fn sql(&self) -> &'static str {
        match self {
            RecipeOrdering::Newest => "recipes.created_at DESC, recipes.id DESC",
            RecipeOrdering::Oldest => "recipes.created_at ASC, recipes.id ASC",
            RecipeOrdering::MostViewed => "recipes.views_count DESC, recipes.id DESC",
            RecipeOrdering::LeastViewed => "recipes.views_count ASC, recipes.id ASC",
            RecipeOrdering::MostLiked => "recipes.likes_count DESC, recipes.id DESC",
            RecipeOrdering::LeastLiked => "recipes.likes_count ASC, recipes.id ASC",
            RecipeOrdering::TitleAsc => "recipes.title ASC, recipes.id ASC",
            RecipeOrdering::TitleDesc => "recipes.title DESC, recipes.id DESC",
        }
    }
}

pub async fn list_recipes_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    filter: &RecipeFilter,
    ordering: RecipeOrdering,
    page: &Page,
) -> Result<(Vec<Recipe>, i64), RequestError> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|search| !search.is_empty());

    let count = sqlx::query_scalar::<Sqlite, i64>(&format!(
        "SELECT COUNT(*) FROM recipes JOIN users ON users.id = recipes.author_id {RECIPE_FILTER}"
    ))
    .bind(viewer)
    .bind(search)
    .bind(filter.category_id)
    .bind(filter.difficulty)
    .bind(filter.author.as_deref())
    .bind(filter.tag_id)
    .fetch_one(pool)
    .await?;

    let result = sqlx::query_as::<Sqlite, Recipe>(&format!(
        "{RECIPE_QUERY} {RECIPE_FILTER} ORDER BY {} LIMIT $7 OFFSET $8",
        ordering.sql()
    ))
    .bind(viewer)
    .bind(search)
    .bind(filter.category_id)
    .bind(filter.difficulty)
    .bind(filter.author.as_deref())
    .bind(filter.tag_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((result, count))
}

/// Every visible recipe matching `filter`, newest first, unpaginated.
pub async fn get_recipes_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    filter: &RecipeFilter,
) -> Result<Vec<Recipe>, RequestError> {
    let page = Page {
        number: 1,
        size: i64::MAX as u64,
    };
    let (recipes, _) =
        list_recipes_in_db(pool, viewer, filter, RecipeOrdering::Newest, &page).await?;
    Ok(recipes)
}

pub async fn get_recipe_in_db(
    pool: &SqlitePool,
    id: i64,
    viewer: Option<i64>,
) -> Result<Option<Recipe>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Recipe>(&format!(
        "{RECIPE_QUERY} WHERE recipes.id = $1 AND (recipes.published = 1 OR recipes.author_id = $2)"
    ))
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?;
    Ok(result)
}

async fn ensure_category_exists(
    tx: &mut Tx<'_>,
    category_id: Option<i64>,
) -> Result<(), RequestError> {
    if let Some(category_id) = category_id {
        let exists = sqlx::query_scalar::<Sqlite, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)",
        )
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(invalid_pk("category_id", category_id));
        }
    }
    Ok(())
}

/// Inserts the recipe and its tag links, returning the new id.
pub async fn create_recipe_in_db(
    pool: &SqlitePool,
    author_id: i64,
    RecipeRequest {
        title,
        description,
        ingredients,
        instructions,
        category_id,
        tag_ids,
        prep_time,
        cook_time,
        servings,
        difficulty,
        published,
        image,
    }: RecipeRequest,
) -> Result<i64, RequestError> {
    let mut tx = pool.begin().await?;
    ensure_category_exists(&mut tx, category_id).await?;

    let recipe_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO recipes (author_id, category_id, title, description, ingredients,
                             instructions, prep_time, cook_time, servings, difficulty,
                             published, image)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NULLIF($12, ''))
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(category_id)
    .bind(title.trim())
    .bind(description)
    .bind(ingredients)
    .bind(instructions)
    .bind(prep_time)
    .bind(cook_time)
    .bind(servings)
    .bind(difficulty)
    .bind(published)
    .bind(image)
    .fetch_one(&mut tx)
    .await?;

    if let Some(tag_ids) = tag_ids {
        set_recipe_tags(&mut tx, recipe_id, &tag_ids).await?;
    }
    tx.commit().await?;
    Ok(recipe_id)
}

async fn ensure_author(
    tx: &mut Tx<'_>,
    recipe_id: i64,
    user: &AuthUser,
) -> Result<(), RequestError> {
    let author_id = owner_of(
        tx,
        "SELECT author_id FROM recipes WHERE id = $1",
        recipe_id,
        "Recipe not found",
    )
    .await?;
    user.ensure_owns(author_id, "Only the recipe author can update this recipe.")
}

/// Overwrites every column with the request, so absent optional fields
/// (category, times, image) end up NULL. Tags are only replaced when given.
pub async fn replace_recipe_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
    user: &AuthUser,
    RecipeRequest {
        title,
        description,
        ingredients,
        instructions,
        category_id,
        tag_ids,
        prep_time,
        cook_time,
        servings,
        difficulty,
        published,
        image,
    }: RecipeRequest,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    ensure_author(&mut tx, recipe_id, user).await?;
    ensure_category_exists(&mut tx, category_id).await?;

    sqlx::query(
        r#"
        UPDATE recipes
        SET    title = $1,
               description = $2,
               ingredients = $3,
               instructions = $4,
               category_id = $5,
               prep_time = $6,
               cook_time = $7,
               servings = $8,
               difficulty = $9,
               published = $10,
               image = NULLIF($11, ''),
               updated_at = CURRENT_TIMESTAMP
        WHERE  id = $12 AND author_id = $13
        "#,
    )
    .bind(title.trim())
    .bind(description)
    .bind(ingredients)
    .bind(instructions)
    .bind(category_id)
    .bind(prep_time)
    .bind(cook_time)
    .bind(servings)
    .bind(difficulty)
    .bind(published)
    .bind(image)
    .bind(recipe_id)
    .bind(user.id)
    .execute(&mut tx)
    .await?;

    if let Some(tag_ids) = tag_ids {
        set_recipe_tags(&mut tx, recipe_id, &tag_ids).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Applies the present fields. Only the recipe's author may do this.
pub async fn update_recipe_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
    user: &AuthUser,
    UpdateRecipeRequest {
        title,
        description,
        ingredients,
        instructions,
        category_id,
        tag_ids,
        prep_time,
        cook_time,
        servings,
        difficulty,
        published,
        image,
    }: UpdateRecipeRequest,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    ensure_author(&mut tx, recipe_id, user).await?;
    ensure_category_exists(&mut tx, category_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE recipes
        SET    title = COALESCE($1, title),
               description = COALESCE($2, description),
               ingredients = COALESCE($3, ingredients),
               instructions = COALESCE($4, instructions),
               category_id = COALESCE($5, category_id),
               prep_time = COALESCE($6, prep_time),
               cook_time = COALESCE($7, cook_time),
               servings = COALESCE($8, servings),
               difficulty = COALESCE($9, difficulty),
               published = COALESCE($10, published),
               image = CASE WHEN $11 IS NULL THEN image ELSE NULLIF($11, '') END,
               updated_at = CURRENT_TIMESTAMP
        WHERE  id = $12 AND author_id = $13
        "#,
    )
    .bind(title.as_deref().map(str::trim))
    .bind(description)
    .bind(ingredients)
    .bind(instructions)
    .bind(category_id)
    .bind(prep_time)
    .bind(cook_time)
    .bind(servings)
    .bind(difficulty)
    .bind(published)
    .bind(image)
    .bind(recipe_id)
    .bind(user.id)
    .execute(&mut tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::Forbidden(
            "Only the recipe author can update this recipe.",
        ));
    }

    if let Some(tag_ids) = tag_ids {
        set_recipe_tags(&mut tx, recipe_id, &tag_ids).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Deletes the recipe; its comments, ratings and tag links cascade.
pub async fn delete_recipe_in_db(
    pool: &SqlitePool,
    recipe_id: i64,
    user: &AuthUser,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let author_id = owner_of(
        &mut tx,
        "SELECT author_id FROM recipes WHERE id = $1",
        recipe_id,
        "Recipe not found",
    )
    .await?;
    user.ensure_owns(author_id, "Only the recipe author can delete this recipe.")?;

    sqlx::query("DELETE FROM recipes WHERE id = $1 AND author_id = $2")
        .bind(recipe_id)
        .bind(user.id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_formats::CategoryRequest;
    use crate::db_helpers::{
        add_comment_in_db, create_category_in_db, get_comments_for_recipe_in_db,
        get_or_create_tags_in_db, get_tags_for_recipe_in_db, test_support::*,
        upsert_rating_in_db,
    };

    fn as_user(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("user{id}"),
            token: String::new(),
        }
    }

    #[tokio::test]
    async fn derived_fields_come_from_related_rows() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let recipe_id = create_recipe_in_db(&pool, author, recipe_request("Carbonara", None))
            .await
            .unwrap();
        for (i, score) in [3, 4, 5].into_iter().enumerate() {
            let rater = create_user(&pool, &format!("rater{i}")).await;
            upsert_rating_in_db(&pool, recipe_id, rater, score).await.unwrap();
        }
        add_comment_in_db(&pool, recipe_id, author, "Grazie").await.unwrap();

        let recipe = get_recipe_in_db(&pool, recipe_id, None).await.unwrap().unwrap();
        assert_eq!(recipe.average_rating(), 4.0);
        assert_eq!(recipe.total_time(), 30);
        assert_eq!(recipe.comments_count, 1);
        assert_eq!(recipe.author_username, "chef_mario");
    }

    #[tokio::test]
    async fn deleting_recipe_cascades_comments_and_ratings() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let other = create_user(&pool, "cook_sarah").await;
        let recipe_id = create_recipe_in_db(&pool, author, recipe_request("Carbonara", None))
            .await
            .unwrap();
        add_comment_in_db(&pool, recipe_id, other, "Lovely").await.unwrap();
        upsert_rating_in_db(&pool, recipe_id, other, 5).await.unwrap();

        delete_recipe_in_db(&pool, recipe_id, &as_user(author)).await.unwrap();

        let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&pool)
            .await
            .unwrap();
        let ratings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((comments, ratings), (0, 0));
        assert!(get_comments_for_recipe_in_db(&pool, recipe_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_author_may_update_or_delete() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let other = create_user(&pool, "cook_sarah").await;
        let recipe_id = create_recipe_in_db(&pool, author, recipe_request("Carbonara", None))
            .await
            .unwrap();

        let update = || UpdateRecipeRequest {
            title: Some("Stolen".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_recipe_in_db(&pool, recipe_id, &as_user(other), update()).await,
            Err(RequestError::Forbidden(_))
        ));
        assert!(matches!(
            delete_recipe_in_db(&pool, recipe_id, &as_user(other)).await,
            Err(RequestError::Forbidden(_))
        ));

        update_recipe_in_db(&pool, recipe_id, &as_user(author), update())
            .await
            .unwrap();
        let recipe = get_recipe_in_db(&pool, recipe_id, None).await.unwrap().unwrap();
        assert_eq!(recipe.title, "Stolen");
        assert_eq!(recipe.servings, 2);
    }

    #[tokio::test]
    async fn replace_clears_optional_fields() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let other = create_user(&pool, "cook_sarah").await;
        let category = create_category_in_db(
            &pool,
            CategoryRequest {
                name: "Italian".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let mut request = recipe_request("Carbonara", Some(category.id));
        request.image = Some("https://example.com/carbonara.jpg".into());
        let recipe_id = create_recipe_in_db(&pool, author, request).await.unwrap();

        let mut replacement = recipe_request("Carbonara", None);
        replacement.prep_time = None;
        replacement.cook_time = None;
        assert!(matches!(
            replace_recipe_in_db(&pool, recipe_id, &as_user(other), recipe_request("Mine", None))
                .await,
            Err(RequestError::Forbidden(_))
        ));
        replace_recipe_in_db(&pool, recipe_id, &as_user(author), replacement)
            .await
            .unwrap();

        let recipe = get_recipe_in_db(&pool, recipe_id, None).await.unwrap().unwrap();
        assert_eq!((recipe.prep_time, recipe.cook_time), (None, None));
        assert_eq!(recipe.total_time(), 0);
        assert_eq!(recipe.category_id, None);
        assert_eq!(recipe.image, None);
    }

    #[tokio::test]
    async fn unknown_tag_or_category_is_a_field_error() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let error = create_recipe_in_db(&pool, author, recipe_request("Carbonara", Some(99)))
            .await
            .unwrap_err();
        assert!(matches!(error, RequestError::Validation(ref f) if f.contains_key("category_id")));

        let mut request = recipe_request("Carbonara", None);
        request.tag_ids = Some(vec![42]);
        let error = create_recipe_in_db(&pool, author, request).await.unwrap_err();
        assert!(matches!(error, RequestError::Validation(ref f) if f.contains_key("tag_ids")));
    }

    #[tokio::test]
    async fn tags_are_replaced_on_update() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let ids = get_or_create_tags_in_db(&pool, &["Quick".into(), "Spicy".into()])
            .await
            .unwrap();
        let mut request = recipe_request("Tacos", None);
        request.tag_ids = Some(ids.clone());
        let recipe_id = create_recipe_in_db(&pool, author, request).await.unwrap();
        assert_eq!(get_tags_for_recipe_in_db(&pool, recipe_id).await.unwrap().len(), 2);

        update_recipe_in_db(
            &pool,
            recipe_id,
            &as_user(author),
            UpdateRecipeRequest {
                tag_ids: Some(vec![ids[1]]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let tags = get_tags_for_recipe_in_db(&pool, recipe_id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Spicy");
    }

    #[tokio::test]
    async fn search_filters_and_visibility() {
        let pool = test_pool().await;
        let author = create_user(&pool, "chef_mario").await;
        let other = create_user(&pool, "cook_sarah").await;
        create_recipe_in_db(&pool, author, recipe_request("Spaghetti Carbonara", None))
            .await
            .unwrap();
        let mut hidden = recipe_request("Secret Tacos", None);
        hidden.published = false;
        let hidden_id = create_recipe_in_db(&pool, author, hidden).await.unwrap();

        let page = Page::new(None, 10);
        let filter = RecipeFilter {
            search: Some("CARBON".into()),
            ..Default::default()
        };
        let (found, count) =
            list_recipes_in_db(&pool, None, &filter, RecipeOrdering::Newest, &page)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(found[0].title, "Spaghetti Carbonara");

        let everything = RecipeFilter::default();
        let (_, anonymous) =
            list_recipes_in_db(&pool, None, &everything, RecipeOrdering::Newest, &page)
                .await
                .unwrap();
        let (_, own) =
            list_recipes_in_db(&pool, Some(author), &everything, RecipeOrdering::Newest, &page)
                .await
                .unwrap();
        assert_eq!((anonymous, own), (1, 2));
        assert!(get_recipe_in_db(&pool, hidden_id, Some(other)).await.unwrap().is_none());
        assert!(get_recipe_in_db(&pool, hidden_id, Some(author)).await.unwrap().is_some());
    }

    #[test]
    fn ordering_is_whitelisted() {
        assert_eq!(RecipeOrdering::parse(None).unwrap(), RecipeOrdering::Newest);
        assert_eq!(
            RecipeOrdering::parse(Some("-likes_count")).unwrap(),
            RecipeOrdering::MostLiked
        );
        assert!(RecipeOrdering::parse(Some("id; DROP TABLE recipes")).is_err());
    }
}
