use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path},
    http::StatusCode,
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::{
    authentication::AuthUser,
    config::Config,
    data_formats::{CommentQueryParams, NewRatingRequest, Paginated, RatingRequest, RatingResponse},
    db_helpers::{
        delete_rating_in_db, get_rating_in_db, get_recipe_in_db, invalid_pk, list_ratings_in_db,
        update_rating_in_db, upsert_rating_in_db,
    },
    errors::RequestError,
    extractors::{QueryParams, ValidatedJson},
};

use super::{ensure_page_exists, page, CreatedResult, JsonResult};

fn required_score(score: Option<i64>) -> Result<i64, RequestError> {
    score.ok_or_else(|| RequestError::invalid_field("score", "Score field is required."))
}

pub async fn list_ratings(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    QueryParams(params): QueryParams<CommentQueryParams>,
) -> JsonResult<Paginated<RatingResponse>> {
    let page = page(&config, params.page);
    let (ratings, count) = list_ratings_in_db(&pool, params.recipe, &page).await?;
    ensure_page_exists(&page, count)?;
    let results = ratings.into_iter().map(RatingResponse::from).collect();
    Ok(Json(Paginated::new(results, count, &page, &uri)))
}

/// Same contract as the recipe's `rate` action: a second rating by the same
/// user replaces the first and answers 200.
pub async fn create_rating(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    ValidatedJson(NewRatingRequest { recipe, score }): ValidatedJson<NewRatingRequest>,
) -> CreatedResult<RatingResponse> {
    let score = required_score(score)?;
    let recipe = get_recipe_in_db(&pool, recipe, Some(user.id))
        .await?
        .ok_or_else(|| invalid_pk("recipe", recipe))?;
    let (rating, created) = upsert_rating_in_db(&pool, recipe.id, user.id, score).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(RatingResponse::from(rating))))
}

pub async fn get_rating(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(id): Path<i64>,
) -> JsonResult<RatingResponse> {
    let rating = get_rating_in_db(&pool, id).await?;
    Ok(Json(RatingResponse::from(rating)))
}

/// Serves both PUT and PATCH; `score` is the only writable field.
pub async fn update_rating(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(RatingRequest { score }): ValidatedJson<RatingRequest>,
) -> JsonResult<RatingResponse> {
    let rating = update_rating_in_db(&pool, id, &user, required_score(score)?).await?;
    Ok(Json(RatingResponse::from(rating)))
}

pub async fn delete_rating(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    delete_rating_in_db(&pool, id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
