use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Comment, Difficulty, Profile, Rating, Recipe, Tag, User};

#[derive(Deserialize, Serialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub token: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProfileResponse {
    pub username: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CommentResponse {
    pub id: i64,
    pub user: i64,
    pub user_username: String,
    pub recipe: i64,
    pub recipe_title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RatingResponse {
    pub id: i64,
    pub user: i64,
    pub user_username: String,
    pub recipe: i64,
    pub recipe_title: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

/// Reduced recipe shape used by list endpoints.
#[derive(Deserialize, Serialize, Debug)]
pub struct RecipeListResponse {
    pub id: i64,
    pub title: String,
    pub author: i64,
    pub author_username: String,
    pub category: Option<i64>,
    pub category_name: Option<String>,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub total_time: i64,
    pub servings: i64,
    pub difficulty: Difficulty,
    pub published: bool,
    pub views_count: i64,
    pub likes_count: i64,
    pub average_rating: f64,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct RecipeDetailResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
    pub author: i64,
    pub author_username: String,
    pub category: Option<CategoryResponse>,
    pub tags: Vec<TagResponse>,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub total_time: i64,
    pub servings: i64,
    pub difficulty: Difficulty,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub views_count: i64,
    pub likes_count: i64,
    pub average_rating: f64,
    pub comments_count: i64,
    pub image: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct AverageRatingResponse {
    pub id: i64,
    pub title: String,
    pub average_rating: f64,
    pub total_ratings: usize,
}

impl UserResponse {
    pub fn new(User { id, username, email, .. }: User, token: String) -> Self {
        UserResponse {
            id,
            username,
            email,
            token,
        }
    }
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        ProfileResponse {
            username: profile.username,
            bio: profile.bio,
            avatar: profile.avatar,
            location: profile.location,
            website: profile.website,
            followers_count: profile.followers_count,
            following_count: profile.following_count,
        }
    }
}

impl From<Category> for CategoryResponse {
    fn from(
        Category {
            id,
            name,
            description,
            created_at,
        }: Category,
    ) -> Self {
        CategoryResponse {
            id,
            name,
            description,
            created_at,
        }
    }
}

impl From<Tag> for TagResponse {
    fn from(Tag { id, name, created_at }: Tag) -> Self {
        TagResponse {
            id,
            name,
            created_at,
        }
    }
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        CommentResponse {
            id: comment.id,
            user: comment.user_id,
            user_username: comment.user_username,
            recipe: comment.recipe_id,
            recipe_title: comment.recipe_title,
            text: comment.text,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            likes_count: comment.likes_count,
        }
    }
}

impl From<Rating> for RatingResponse {
    fn from(rating: Rating) -> Self {
        RatingResponse {
            id: rating.id,
            user: rating.user_id,
            user_username: rating.user_username,
            recipe: rating.recipe_id,
            recipe_title: rating.recipe_title,
            score: rating.score,
            created_at: rating.created_at,
        }
    }
}

impl From<Recipe> for RecipeListResponse {
    fn from(recipe: Recipe) -> Self {
        let average_rating = recipe.average_rating();
        let total_time = recipe.total_time();
        RecipeListResponse {
            id: recipe.id,
            title: recipe.title,
            author: recipe.author_id,
            author_username: recipe.author_username,
            category: recipe.category_id,
            category_name: recipe.category_name,
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            total_time,
            servings: recipe.servings,
            difficulty: recipe.difficulty,
            published: recipe.published,
            views_count: recipe.views_count,
            likes_count: recipe.likes_count,
            average_rating,
            image: recipe.image,
            created_at: recipe.created_at,
        }
    }
}

impl RecipeDetailResponse {
    pub fn new(recipe: Recipe, category: Option<Category>, tags: Vec<Tag>) -> Self {
        let average_rating = recipe.average_rating();
        let total_time = recipe.total_time();
        RecipeDetailResponse {
            id: recipe.id,
            title: recipe.title,
            description: recipe.description,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            author: recipe.author_id,
            author_username: recipe.author_username,
            category: category.map(CategoryResponse::from),
            tags: tags.into_iter().map(TagResponse::from).collect(),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            total_time,
            servings: recipe.servings,
            difficulty: recipe.difficulty,
            published: recipe.published,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
            views_count: recipe.views_count,
            likes_count: recipe.likes_count,
            average_rating,
            comments_count: recipe.comments_count,
            image: recipe.image,
        }
    }
}

impl AverageRatingResponse {
    pub fn new(recipe: &Recipe) -> Self {
        let scores = recipe.scores();
        AverageRatingResponse {
            id: recipe.id,
            title: recipe.title.clone(),
            average_rating: crate::aggregates::average_rating(&scores),
            total_ratings: scores.len(),
        }
    }
}
