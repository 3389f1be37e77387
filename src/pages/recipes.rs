use std::sync::Arc;

use axum::{extract::Path, Extension};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    authentication::MaybeUser,
    config::Config,
    data_formats::{Page, RecipeRequest},
    db_helpers::{
        add_comment_in_db, create_recipe_in_db, get_all_categories_in_db, get_all_tags_in_db,
        get_comments_for_recipe_in_db, get_or_create_tags_in_db, get_recipe_in_db,
        get_tags_for_recipe_in_db, list_recipes_in_db, replace_recipe_in_db, upsert_rating_in_db,
        RecipeFilter, RecipeOrdering,
    },
    errors::RequestError,
    extractors::{PageForm, QueryParams},
    models::{Difficulty, Recipe},
};

use super::{
    redirect_with_notice, render, render_page, LoginRequired, PageError, PageResult,
    RedirectResult,
};

#[derive(Deserialize, Debug, Default)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

/// The recipe page posts either a comment or a rating to the same URL.
#[derive(Deserialize, Debug, Default)]
pub struct RecipeActionForm {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
}

/// Raw recipe form fields. Numbers arrive as strings so an empty input can
/// mean "not set".
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RecipeForm {
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
    pub category_id: String,
    pub tags: String,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: String,
    pub difficulty: Option<Difficulty>,
    pub published: Option<String>,
    pub image: String,
}

fn parse_number(field: &str, value: &str) -> Result<Option<i64>, RequestError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| RequestError::invalid_field(field, "Enter a whole number."))
}

impl RecipeForm {
    /// Validated request plus the tag names typed into the form.
    fn into_request(self) -> Result<(RecipeRequest, Vec<String>), RequestError> {
        let request = RecipeRequest {
            category_id: parse_number("category_id", &self.category_id)?,
            prep_time: parse_number("prep_time", &self.prep_time)?,
            cook_time: parse_number("cook_time", &self.cook_time)?,
            servings: parse_number("servings", &self.servings)?.unwrap_or(4),
            difficulty: self.difficulty.unwrap_or_default(),
            published: self.published.is_some(),
            image: Some(self.image.trim().to_string()),
            tag_ids: None,
            title: self.title,
            description: self.description,
            ingredients: self.ingredients,
            instructions: self.instructions,
        };
        request.validate()?;
        let tags = self
            .tags
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Ok((request, tags))
    }
}

async fn with_tags(
    pool: &SqlitePool,
    form: RecipeForm,
) -> Result<RecipeRequest, RequestError> {
    let (mut request, tags) = form.into_request()?;
    request.tag_ids = Some(get_or_create_tags_in_db(pool, &tags).await?);
    Ok(request)
}

/// The recipe if `user_id` wrote it; anybody else gets a 404.
async fn own_recipe(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Recipe, RequestError> {
    get_recipe_in_db(pool, id, Some(user_id))
        .await?
        .filter(|recipe| recipe.author_id == user_id)
        .ok_or(RequestError::NotFound("No recipe matches the given query."))
}

pub async fn home_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    QueryParams(params): QueryParams<SearchParams>,
) -> PageResult {
    let page = Page::new(params.page, config.page_size);
    let filter = RecipeFilter {
        search: params.q.clone(),
        ..Default::default()
    };
    let viewer = user.as_ref().map(|user| user.id);
    let (recipes, count) =
        list_recipes_in_db(&pool, viewer, &filter, RecipeOrdering::Newest, &page).await?;
    if !page.exists_for(count) {
        return Err(PageError(RequestError::NotFound("Invalid page.")));
    }
    let categories = get_all_categories_in_db(&pool).await?;
    let tags = get_all_tags_in_db(&pool).await?;

    let total_pages = (count.max(0) as u64 + page.size - 1) / page.size;
    let query = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let body = format!(
        r#"<h1>Latest recipes</h1>
<form method="get" action="/"><input name="q" value="{q}" placeholder="Search recipes"><button type="submit">Search</button></form>
{recipes}
{pager}
<aside>
  <h2>Categories</h2>
  {categories}
  <h2>Tags</h2>
  {tags}
</aside>"#,
        q = render::escape(query.unwrap_or_default()),
        recipes = render::recipe_cards(&recipes),
        pager = render::pager("/", query, page.number, total_pages),
        categories = render::category_links(&categories),
        tags = render::tag_links(&tags),
    );
    Ok(render_page(jar, "Recipes", user.as_ref(), &body))
}

pub async fn recipe_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> PageResult {
    let recipe = get_recipe_in_db(&pool, id, user.as_ref().map(|user| user.id))
        .await?
        .ok_or(RequestError::NotFound("No recipe matches the given query."))?;
    let tags = get_tags_for_recipe_in_db(&pool, recipe.id).await?;
    let comments = get_comments_for_recipe_in_db(&pool, recipe.id).await?;
    let body = render::recipe_detail(&recipe, &tags, &comments, user.as_ref());
    Ok(render_page(jar, &recipe.title, user.as_ref(), &body))
}

pub async fn recipe_page_action(
    Extension(pool): Extension<Arc<SqlitePool>>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(id): Path<i64>,
    PageForm(form): PageForm<RecipeActionForm>,
) -> RedirectResult {
    let Some(user) = user else {
        return Ok(redirect_with_notice(
            jar,
            "/accounts/login/",
            "You must be logged in to comment or rate.",
        ));
    };
    let recipe = get_recipe_in_db(&pool, id, Some(user.id))
        .await?
        .ok_or(RequestError::NotFound("No recipe matches the given query."))?;
    let back = format!("/recipe/{}/", recipe.id);

    if let Some(text) = form.text.as_deref().filter(|text| !text.trim().is_empty()) {
        add_comment_in_db(&pool, recipe.id, user.id, text).await?;
        return Ok(redirect_with_notice(jar, &back, "Comment added!"));
    }

    let score = form
        .score
        .as_deref()
        .and_then(|score| score.trim().parse::<i64>().ok())
        .filter(|score| (1..=5).contains(score));
    match score {
        Some(score) => {
            let (_, created) = upsert_rating_in_db(&pool, recipe.id, user.id, score).await?;
            let notice = if created { "Rating added!" } else { "Rating updated!" };
            Ok(redirect_with_notice(jar, &back, notice))
        }
        None => Ok(redirect_with_notice(
            jar,
            &back,
            "Write a comment or pick a score between 1 and 5.",
        )),
    }
}

pub async fn create_recipe_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    LoginRequired(user): LoginRequired,
    jar: CookieJar,
) -> PageResult {
    let categories = get_all_categories_in_db(&pool).await?;
    let values = render::RecipeFormValues {
        servings: 4,
        published: true,
        ..Default::default()
    };
    let body = format!(
        "<h1>New recipe</h1>\n{}",
        render::recipe_form("/recipe/create/", &values, &categories)
    );
    Ok(render_page(jar, "New recipe", Some(&user), &body))
}

pub async fn create_recipe_submit(
    Extension(pool): Extension<Arc<SqlitePool>>,
    LoginRequired(user): LoginRequired,
    jar: CookieJar,
    PageForm(form): PageForm<RecipeForm>,
) -> RedirectResult {
    let created = async {
        let request = with_tags(&pool, form).await?;
        create_recipe_in_db(&pool, user.id, request).await
    }
    .await;
    match created {
        Ok(recipe_id) => {
            tracing::info!(recipe_id, author = user.id, "recipe created from page");
            Ok(redirect_with_notice(jar, &format!("/recipe/{recipe_id}/"), "Recipe created!"))
        }
        Err(e) if e.status_code().is_client_error() => {
            Ok(redirect_with_notice(jar, "/recipe/create/", &e.user_message()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn edit_recipe_page(
    Extension(pool): Extension<Arc<SqlitePool>>,
    LoginRequired(user): LoginRequired,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> PageResult {
    let recipe = own_recipe(&pool, id, user.id).await?;
    let tags = get_tags_for_recipe_in_db(&pool, recipe.id).await?;
    let categories = get_all_categories_in_db(&pool).await?;
    let values = render::RecipeFormValues::from_recipe(&recipe, &tags);
    let body = format!(
        "<h1>Edit {}</h1>\n{}",
        render::escape(&recipe.title),
        render::recipe_form(&format!("/recipe/{}/edit/", recipe.id), &values, &categories)
    );
    Ok(render_page(jar, "Edit recipe", Some(&user), &body))
}

pub async fn edit_recipe_submit(
    Extension(pool): Extension<Arc<SqlitePool>>,
    LoginRequired(user): LoginRequired,
    jar: CookieJar,
    Path(id): Path<i64>,
    PageForm(form): PageForm<RecipeForm>,
) -> RedirectResult {
    let recipe = own_recipe(&pool, id, user.id).await?;
    let back = format!("/recipe/{}/edit/", recipe.id);
    let updated = async {
        let request = with_tags(&pool, form).await?;
        replace_recipe_in_db(&pool, recipe.id, &user, request).await
    }
    .await;
    match updated {
        Ok(()) => Ok(redirect_with_notice(
            jar,
            &format!("/recipe/{}/", recipe.id),
            "Recipe updated!",
        )),
        Err(e) if e.status_code().is_client_error() => {
            Ok(redirect_with_notice(jar, &back, &e.user_message()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RecipeForm {
        RecipeForm {
            title: "Tacos".into(),
            description: "Street style.".into(),
            ingredients: "Tortillas".into(),
            instructions: "Assemble.".into(),
            tags: " Quick, ,Spicy ".into(),
            prep_time: "10".into(),
            servings: String::new(),
            published: Some("on".into()),
            ..Default::default()
        }
    }

    #[test]
    fn form_fields_become_a_request() {
        let (request, tags) = form().into_request().unwrap();
        assert_eq!(request.prep_time, Some(10));
        assert_eq!(request.cook_time, None);
        assert_eq!(request.servings, 4);
        assert_eq!(request.difficulty, Difficulty::Medium);
        assert!(request.published);
        assert_eq!(tags, vec!["Quick".to_string(), "Spicy".to_string()]);
    }

    #[test]
    fn bad_numbers_and_blank_titles_are_field_errors() {
        let mut bad = form();
        bad.cook_time = "twenty".into();
        assert!(matches!(
            bad.into_request(),
            Err(RequestError::Validation(ref fields)) if fields.contains_key("cook_time")
        ));

        let mut blank = form();
        blank.title = "   ".into();
        assert!(matches!(
            blank.into_request(),
            Err(RequestError::Validation(ref fields)) if fields.contains_key("title")
        ));
    }
}
