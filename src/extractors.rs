//! Body extractors that turn malformed or invalid payloads into 400s.

use axum::{
    body::HttpBody,
    extract::{FromRequest, Query},
    http::Request,
    BoxError, Form, Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::RequestError;

/// JSON body that has been deserialized and passed `Validate`.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = RequestError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| RequestError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Url-encoded form body, deserialized only. Page handlers validate
/// themselves so they can redirect with a notice instead of failing.
pub struct PageForm<T>(pub T);

#[axum::async_trait]
impl<T, S, B> FromRequest<S, B> for PageForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = RequestError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| RequestError::BadRequest(rejection.body_text()))?;
        Ok(PageForm(value))
    }
}

/// Query string with a 400 on bad parameters instead of axum's plain text.
pub struct QueryParams<T>(pub T);

#[axum::async_trait]
impl<T, S> axum::extract::FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| RequestError::BadRequest(rejection.body_text()))?;
        Ok(QueryParams(value))
    }
}
