use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::models::Difficulty;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Empty strings are how forms clear an optional link.
fn url_or_empty(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || validator::validate_url(value) {
        return Ok(());
    }
    Err(ValidationError::new("url"))
}

fn default_servings() -> i64 {
    4
}

fn default_published() -> bool {
    true
}

// ----------------- User Request -----------------
#[derive(Deserialize, Debug, Validate)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters."),
        custom(function = "valid_username", message = "Username may contain only letters, numbers and @/./+/-/_ characters.")
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must contain at least 8 characters."))]
    pub password: String,
}

fn valid_username(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        Ok(())
    } else {
        Err(ValidationError::new("username"))
    }
}

#[derive(Deserialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    #[validate(custom(function = "url_or_empty", message = "Enter a valid URL."))]
    pub avatar: Option<String>,
    #[validate(length(max = 100, message = "Location must be at most 100 characters."))]
    pub location: Option<String>,
    #[validate(custom(function = "url_or_empty", message = "Enter a valid URL."))]
    pub website: Option<String>,
}

// ----------------- Recipe Request -----------------
#[derive(Deserialize, Debug, Validate)]
pub struct RecipeRequest {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters."),
        custom(function = "not_blank", message = "This field may not be blank.")
    )]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "This field may not be blank."))]
    pub description: String,
    #[validate(custom(function = "not_blank", message = "This field may not be blank."))]
    pub ingredients: String,
    #[validate(custom(function = "not_blank", message = "This field may not be blank."))]
    pub instructions: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub prep_time: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub cook_time: Option<i64>,
    #[serde(default = "default_servings")]
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub servings: i64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    #[validate(custom(function = "url_or_empty", message = "Enter a valid URL."))]
    pub image: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Deserialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdateRecipeRequest {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters."),
        custom(function = "not_blank", message = "This field may not be blank.")
    )]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank", message = "This field may not be blank."))]
    pub description: Option<String>,
    #[validate(custom(function = "not_blank", message = "This field may not be blank."))]
    pub ingredients: Option<String>,
    #[validate(custom(function = "not_blank", message = "This field may not be blank."))]
    pub instructions: Option<String>,
    pub category_id: Option<i64>,
    pub tag_ids: Option<Vec<i64>>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub prep_time: Option<i64>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub cook_time: Option<i64>,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub servings: Option<i64>,
    pub difficulty: Option<Difficulty>,
    pub published: Option<bool>,
    #[validate(custom(function = "url_or_empty", message = "Enter a valid URL."))]
    pub image: Option<String>,
}

// ----------------- Category / Tag Request -----------------
#[derive(Deserialize, Debug, Validate)]
pub struct CategoryRequest {
    #[validate(
        length(max = 100, message = "Name must be at most 100 characters."),
        custom(function = "not_blank", message = "This field may not be blank.")
    )]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Default, Validate)]
#[serde(default)]
pub struct UpdateCategoryRequest {
    #[validate(
        length(max = 100, message = "Name must be at most 100 characters."),
        custom(function = "not_blank", message = "This field may not be blank.")
    )]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct TagRequest {
    #[validate(
        length(max = 50, message = "Name must be at most 50 characters."),
        custom(function = "not_blank", message = "This field may not be blank.")
    )]
    pub name: String,
}

// ----------------- Comment / Rating Request -----------------
#[derive(Deserialize, Debug, Validate)]
pub struct CommentRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Text field is required."))]
    pub text: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct NewCommentRequest {
    pub recipe: i64,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Text field is required."))]
    pub text: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct RatingRequest {
    #[serde(default)]
    #[validate(
        required(message = "Score field is required."),
        range(min = 1, max = 5, message = "Score must be an integer between 1 and 5.")
    )]
    pub score: Option<i64>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct NewRatingRequest {
    pub recipe: i64,
    #[serde(default)]
    #[validate(
        required(message = "Score field is required."),
        range(min = 1, max = 5, message = "Score must be an integer between 1 and 5.")
    )]
    pub score: Option<i64>,
}
