use std::sync::Arc;

use axum::{
    http::{StatusCode, Uri},
    Json,
};

use crate::{config::Config, data_formats::Page, errors::RequestError};

mod categories;
mod comments;
mod ratings;
mod recipes;
mod tags;
mod users;

pub use categories::*;
pub use comments::*;
pub use ratings::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;

type JsonResult<T> = Result<Json<T>, RequestError>;
type CreatedResult<T> = Result<(StatusCode, Json<T>), RequestError>;

fn page(config: &Arc<Config>, number: Option<u32>) -> Page {
    Page::new(number, config.page_size)
}

fn ensure_page_exists(page: &Page, count: i64) -> Result<(), RequestError> {
    if page.exists_for(count) {
        Ok(())
    } else {
        Err(RequestError::NotFound("Invalid page."))
    }
}

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> RequestError {
    tracing::debug!("No route for {}", uri);
    RequestError::NotFound("Not found.")
}
