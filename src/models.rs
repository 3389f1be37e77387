use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregates::{average_rating, parse_scores, total_time};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// A recipe row joined with its author, category name and the raw rating
/// scores and comment count needed for the derived fields.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
    pub prep_time: Option<i64>,
    pub cook_time: Option<i64>,
    pub servings: i64,
    pub difficulty: Difficulty,
    pub image: Option<String>,
    pub published: bool,
    pub views_count: i64,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub rating_scores: Option<String>,
    pub comments_count: i64,
}

impl Recipe {
    pub fn scores(&self) -> Vec<i64> {
        parse_scores(self.rating_scores.as_deref())
    }

    pub fn average_rating(&self) -> f64 {
        average_rating(&self.scores())
    }

    pub fn total_time(&self) -> i64 {
        total_time(self.prep_time, self.cook_time)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub recipe_id: i64,
    pub recipe_title: String,
    pub user_id: i64,
    pub user_username: String,
    pub text: String,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub recipe_id: i64,
    pub recipe_title: String,
    pub user_id: i64,
    pub user_username: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}
