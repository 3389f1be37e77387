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
    data_formats::{CommentQueryParams, CommentRequest, CommentResponse, NewCommentRequest, Paginated},
    db_helpers::{
        add_comment_in_db, delete_comment_in_db, get_comment_in_db, get_recipe_in_db,
        invalid_pk, list_comments_in_db, update_comment_in_db,
    },
    errors::RequestError,
    extractors::{QueryParams, ValidatedJson},
};

use super::{ensure_page_exists, page, CreatedResult, JsonResult};

pub async fn list_comments(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    QueryParams(params): QueryParams<CommentQueryParams>,
) -> JsonResult<Paginated<CommentResponse>> {
    let page = page(&config, params.page);
    let (comments, count) = list_comments_in_db(&pool, params.recipe, &page).await?;
    ensure_page_exists(&page, count)?;
    let results = comments.into_iter().map(CommentResponse::from).collect();
    Ok(Json(Paginated::new(results, count, &page, &uri)))
}

pub async fn create_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    ValidatedJson(NewCommentRequest { recipe, text }): ValidatedJson<NewCommentRequest>,
) -> CreatedResult<CommentResponse> {
    let recipe = get_recipe_in_db(&pool, recipe, Some(user.id))
        .await?
        .ok_or_else(|| invalid_pk("recipe", recipe))?;
    let comment = add_comment_in_db(&pool, recipe.id, user.id, &text).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

pub async fn get_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(id): Path<i64>,
) -> JsonResult<CommentResponse> {
    let comment = get_comment_in_db(&pool, id).await?;
    Ok(Json(CommentResponse::from(comment)))
}

/// Serves both PUT and PATCH; `text` is the only writable field.
pub async fn update_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(CommentRequest { text }): ValidatedJson<CommentRequest>,
) -> JsonResult<CommentResponse> {
    let comment = update_comment_in_db(&pool, id, &user, &text).await?;
    Ok(Json(CommentResponse::from(comment)))
}

pub async fn delete_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    delete_comment_in_db(&pool, id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
