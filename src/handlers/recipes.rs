use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path},
    http::StatusCode,
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::{
    authentication::{AuthUser, MaybeUser},
    config::Config,
    data_formats::{
        AverageRatingResponse, CommentRequest, CommentResponse, Paginated, RatingRequest,
        RatingResponse, RecipeDetailResponse, RecipeListResponse, RecipeQueryParams,
        RecipeRequest, UpdateRecipeRequest,
    },
    db_helpers::{
        add_comment_in_db, create_recipe_in_db, delete_recipe_in_db, get_category_in_db,
        get_comments_for_recipe_in_db, get_ratings_for_recipe_in_db, get_recipe_in_db,
        get_tags_for_recipe_in_db, list_recipes_in_db, replace_recipe_in_db,
        update_recipe_in_db, upsert_rating_in_db, RecipeFilter, RecipeOrdering,
    },
    errors::RequestError,
    extractors::{QueryParams, ValidatedJson},
    models::Recipe,
};

use super::{ensure_page_exists, page, CreatedResult, JsonResult};

async fn load_recipe(
    pool: &SqlitePool,
    id: i64,
    viewer: Option<i64>,
) -> Result<Recipe, RequestError> {
    get_recipe_in_db(pool, id, viewer)
        .await?
        .ok_or(RequestError::NotFound("Recipe not found"))
}

async fn recipe_detail(
    pool: &SqlitePool,
    recipe: Recipe,
) -> Result<RecipeDetailResponse, RequestError> {
    let category = match recipe.category_id {
        Some(category_id) => Some(get_category_in_db(pool, category_id).await?),
        None => None,
    };
    let tags = get_tags_for_recipe_in_db(pool, recipe.id).await?;
    Ok(RecipeDetailResponse::new(recipe, category, tags))
}

// ----------------- Recipe Handlers -----------------
pub async fn list_recipes(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    maybe_user: MaybeUser,
    OriginalUri(uri): OriginalUri,
    QueryParams(params): QueryParams<RecipeQueryParams>,
) -> JsonResult<Paginated<RecipeListResponse>> {
    let ordering = RecipeOrdering::parse(params.ordering.as_deref())?;
    let page = page(&config, params.page);
    let filter = RecipeFilter {
        search: params.search,
        category_id: params.category,
        tag_id: None,
        difficulty: params.difficulty,
        author: params.author,
    };
    let (recipes, count) =
        list_recipes_in_db(&pool, maybe_user.get_id(), &filter, ordering, &page).await?;
    ensure_page_exists(&page, count)?;

    let results = recipes.into_iter().map(RecipeListResponse::from).collect();
    Ok(Json(Paginated::new(results, count, &page, &uri)))
}

pub async fn create_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<RecipeRequest>,
) -> CreatedResult<RecipeDetailResponse> {
    let recipe_id = create_recipe_in_db(&pool, user.id, request).await?;
    tracing::info!(recipe_id, author = user.id, "recipe created");
    let recipe = load_recipe(&pool, recipe_id, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(recipe_detail(&pool, recipe).await?)))
}

pub async fn get_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> JsonResult<RecipeDetailResponse> {
    let recipe = load_recipe(&pool, id, maybe_user.get_id()).await?;
    Ok(Json(recipe_detail(&pool, recipe).await?))
}

pub async fn replace_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<RecipeRequest>,
) -> JsonResult<RecipeDetailResponse> {
    replace_recipe_in_db(&pool, id, &user, request).await?;
    let recipe = load_recipe(&pool, id, Some(user.id)).await?;
    Ok(Json(recipe_detail(&pool, recipe).await?))
}

pub async fn patch_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<UpdateRecipeRequest>,
) -> JsonResult<RecipeDetailResponse> {
    update_recipe_in_db(&pool, id, &user, request).await?;
    let recipe = load_recipe(&pool, id, Some(user.id)).await?;
    Ok(Json(recipe_detail(&pool, recipe).await?))
}

pub async fn delete_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    delete_recipe_in_db(&pool, id, &user).await?;
    tracing::info!(recipe_id = id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- Recipe Actions -----------------
pub async fn list_recipe_comments(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> JsonResult<Vec<CommentResponse>> {
    let recipe = load_recipe(&pool, id, maybe_user.get_id()).await?;
    let comments = get_comments_for_recipe_in_db(&pool, recipe.id).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

pub async fn add_recipe_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(CommentRequest { text }): ValidatedJson<CommentRequest>,
) -> CreatedResult<CommentResponse> {
    let recipe = load_recipe(&pool, id, Some(user.id)).await?;
    let comment = add_comment_in_db(&pool, recipe.id, user.id, &text).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

pub async fn list_recipe_ratings(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> JsonResult<Vec<RatingResponse>> {
    let recipe = load_recipe(&pool, id, maybe_user.get_id()).await?;
    let ratings = get_ratings_for_recipe_in_db(&pool, recipe.id).await?;
    Ok(Json(ratings.into_iter().map(RatingResponse::from).collect()))
}

/// 201 when this is the user's first rating of the recipe, 200 when it
/// replaced an earlier score.
pub async fn add_recipe_rating(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<RatingRequest>,
) -> CreatedResult<RatingResponse> {
    let score = request
        .score
        .ok_or_else(|| RequestError::invalid_field("score", "Score field is required."))?;
    let recipe = load_recipe(&pool, id, Some(user.id)).await?;
    let (rating, created) = upsert_rating_in_db(&pool, recipe.id, user.id, score).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(RatingResponse::from(rating))))
}

pub async fn get_average_rating(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> JsonResult<AverageRatingResponse> {
    let recipe = load_recipe(&pool, id, maybe_user.get_id()).await?;
    Ok(Json(AverageRatingResponse::new(&recipe)))
}
