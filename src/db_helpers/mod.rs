use sqlx::{Sqlite, Transaction};

use crate::errors::RequestError;

mod category_helpers;
mod comment_helpers;
mod profile_helpers;
mod rating_helpers;
mod recipe_helpers;
mod tag_helpers;
mod user_helpers;

pub use category_helpers::*;
pub use comment_helpers::*;
pub use profile_helpers::*;
pub use rating_helpers::*;
pub use recipe_helpers::*;
pub use tag_helpers::*;
pub use user_helpers::*;

pub type Tx<'a> = Transaction<'a, Sqlite>;

pub(crate) fn invalid_pk(field: &str, id: i64) -> RequestError {
    RequestError::invalid_field(field, format!("Invalid pk \"{id}\" - object does not exist."))
}

/// Returns the owner column of a row, or `NotFound` when the row is absent.
async fn owner_of(
    tx: &mut Tx<'_>,
    query: &'static str,
    id: i64,
    missing: &'static str,
) -> Result<i64, RequestError> {
    sqlx::query_scalar::<Sqlite, i64>(query)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RequestError::NotFound(missing))
}
