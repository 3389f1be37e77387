use std::sync::Arc;

use axum::{extract::Path, Extension};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    authentication::MaybeUser,
    data_formats::UpdateProfileRequest,
    db_helpers::{
        get_all_categories_in_db, get_category_in_db, get_or_create_profile,
        get_profile_by_username, get_recipes_in_db, get_tag_in_db, get_user_by_username,
        update_profile_in_db, RecipeFilter,
    },
    errors::RequestError,
    extractors::PageForm,
};

use super::{redirect_with_notice, render, render_page, LoginRequired, PageResult, RedirectResult};

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ProfileForm {
    pub bio: String,
    pub avatar: String,
    pub location: String,
    pub website: String,
}

impl From<ProfileForm> for UpdateProfileRequest {
    fn from(form: ProfileForm) -> Self {
        UpdateProfileRequest {
            bio: Some(form.bio),
            avatar: Some(form.avatar.trim().to_string()),
            location: Some(form.location.trim().to_string()),
            website: Some(form.website.trim().to_string()),
        }
    }
}

pub async fn categories_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> PageResult {
    let categories = get_all_categories_in_db(&pool).await?;
    let body = format!(
        "<h1>Categories</h1>\n{}",
        if categories.is_empty() {
            "<p>No categories yet.</p>".to_string()
        } else {
            render::category_links(&categories)
        }
    );
    Ok(render_page(jar, "Categories", user.as_ref(), &body))
}

pub async fn category_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> PageResult {
    let category = get_category_in_db(&pool, id).await?;
    let filter = RecipeFilter {
        category_id: Some(category.id),
        ..Default::default()
    };
    let recipes = get_recipes_in_db(&pool, user.as_ref().map(|user| user.id), &filter).await?;
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n{}",
        render::escape(&category.name),
        render::escape(category.description.as_deref().unwrap_or_default()),
        render::recipe_cards(&recipes)
    );
    Ok(render_page(jar, &category.name, user.as_ref(), &body))
}

pub async fn tag_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> PageResult {
    let tag = get_tag_in_db(&pool, id).await?;
    let filter = RecipeFilter {
        tag_id: Some(tag.id),
        ..Default::default()
    };
    let recipes = get_recipes_in_db(&pool, user.as_ref().map(|user| user.id), &filter).await?;
    let body = format!(
        "<h1>Tagged {}</h1>\n{}",
        render::escape(&tag.name),
        render::recipe_cards(&recipes)
    );
    Ok(render_page(jar, &tag.name, user.as_ref(), &body))
}

pub async fn profile_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    LoginRequired(viewer): LoginRequired,
    jar: CookieJar,
    Path(username): Path<String>,
) -> PageResult {
    let profile = match get_profile_by_username(&pool, &username).await? {
        Some(profile) => profile,
        None => {
            let user = get_user_by_username(&pool, &username)
                .await?
                .ok_or(RequestError::NotFound("No user matches the given query."))?;
            get_or_create_profile(&pool, user.id).await?
        }
    };
    let filter = RecipeFilter {
        author: Some(profile.username.clone()),
        ..Default::default()
    };
    let recipes = get_recipes_in_db(&pool, Some(viewer.id), &filter).await?;
    let body = render::profile(&profile, &recipes, profile.user_id == viewer.id);
    Ok(render_page(jar, &profile.username, Some(&viewer), &body))
}

pub async fn edit_profile_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    LoginRequired(user): LoginRequired,
    jar: CookieJar,
) -> PageResult {
    let profile = get_or_create_profile(&pool, user.id).await?;
    Ok(render_page(jar, "Edit profile", Some(&user), &render::profile_form(&profile)))
}

pub async fn edit_profile_submit(
    Extension(pool): Extension<Arc<SqlitePool>>,
    LoginRequired(user): LoginRequired,
    jar: CookieJar,
    PageForm(form): PageForm<ProfileForm>,
) -> RedirectResult {
    let request = UpdateProfileRequest::from(form);
    if let Err(errors) = request.validate() {
        let error = RequestError::from(errors);
        return Ok(redirect_with_notice(jar, "/profile/edit/", &error.user_message()));
    }
    update_profile_in_db(&pool, user.id, request).await?;
    Ok(redirect_with_notice(
        jar,
        &format!("/profile/{}/", urlencoding::encode(&user.username)),
        "Profile updated!",
    ))
}
