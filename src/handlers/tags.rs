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
    data_formats::{PageParams, Paginated, TagRequest, TagResponse},
    db_helpers::{create_tag_in_db, get_tag_in_db, list_tags_in_db},
    extractors::{QueryParams, ValidatedJson},
};

use super::{ensure_page_exists, page, CreatedResult, JsonResult};

pub async fn list_tags(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    QueryParams(params): QueryParams<PageParams>,
) -> JsonResult<Paginated<TagResponse>> {
    let page = page(&config, params.page);
    let (tags, count) = list_tags_in_db(&pool, &page).await?;
    ensure_page_exists(&page, count)?;
    let results = tags.into_iter().map(TagResponse::from).collect();
    Ok(Json(Paginated::new(results, count, &page, &uri)))
}

pub async fn create_tag(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _user: AuthUser,
    ValidatedJson(TagRequest { name }): ValidatedJson<TagRequest>,
) -> CreatedResult<TagResponse> {
    let tag = create_tag_in_db(&pool, &name).await?;
    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))))
}

pub async fn get_tag(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(id): Path<i64>,
) -> JsonResult<TagResponse> {
    let tag = get_tag_in_db(&pool, id).await?;
    Ok(Json(TagResponse::from(tag)))
}
