mod request;
mod response;
mod wrapper;

pub use request::*;
pub use response::*;
pub use wrapper::*;

use serde::Deserialize;

use crate::models::Difficulty;

#[derive(Deserialize, Debug, Default)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecipeQueryParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CommentQueryParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub recipe: Option<i64>,
}
