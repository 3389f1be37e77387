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
        CategoryRequest, CategoryResponse, PageParams, Paginated, RecipeListResponse,
        UpdateCategoryRequest,
    },
    db_helpers::{
        create_category_in_db, delete_category_in_db, get_category_in_db, get_recipes_in_db,
        list_categories_in_db, replace_category_in_db, update_category_in_db, RecipeFilter,
    },
    errors::RequestError,
    extractors::{QueryParams, ValidatedJson},
};

use super::{ensure_page_exists, page, CreatedResult, JsonResult};

pub async fn list_categories(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    QueryParams(params): QueryParams<PageParams>,
) -> JsonResult<Paginated<CategoryResponse>> {
    let page = page(&config, params.page);
    let (categories, count) = list_categories_in_db(&pool, &page).await?;
    ensure_page_exists(&page, count)?;
    let results = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(Json(Paginated::new(results, count, &page, &uri)))
}

pub async fn create_category(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _user: AuthUser,
    ValidatedJson(request): ValidatedJson<CategoryRequest>,
) -> CreatedResult<CategoryResponse> {
    let category = create_category_in_db(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

pub async fn get_category(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(id): Path<i64>,
) -> JsonResult<CategoryResponse> {
    let category = get_category_in_db(&pool, id).await?;
    Ok(Json(CategoryResponse::from(category)))
}

pub async fn replace_category(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<CategoryRequest>,
) -> JsonResult<CategoryResponse> {
    let category = replace_category_in_db(&pool, id, request).await?;
    Ok(Json(CategoryResponse::from(category)))
}

pub async fn patch_category(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<UpdateCategoryRequest>,
) -> JsonResult<CategoryResponse> {
    let category = update_category_in_db(&pool, id, request).await?;
    Ok(Json(CategoryResponse::from(category)))
}

pub async fn delete_category(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    delete_category_in_db(&pool, id).await?;
    tracing::info!(category_id = id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_category_recipes(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> JsonResult<Vec<RecipeListResponse>> {
    let category = get_category_in_db(&pool, id).await?;
    let filter = RecipeFilter {
        category_id: Some(category.id),
        ..Default::default()
    };
    let recipes = get_recipes_in_db(&pool, maybe_user.get_id(), &filter).await?;
    Ok(Json(recipes.into_iter().map(RecipeListResponse::from).collect()))
}
