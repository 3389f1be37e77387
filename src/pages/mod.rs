//! Server-rendered HTML pages.
//!
//! Page handlers share the database helpers with the JSON API but report
//! failures differently: form submissions that fail store a one-shot notice
//! in the `flash` cookie and redirect back to the form.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    authentication::{AuthUser, MaybeUser},
    errors::RequestError,
};

mod accounts;
mod browse;
mod recipes;
pub mod render;

pub use accounts::*;
pub use browse::*;
pub use recipes::*;

pub const FLASH_COOKIE: &str = "flash";

type PageResult = Result<(CookieJar, Html<String>), PageError>;
type RedirectResult = Result<(CookieJar, Redirect), PageError>;

/// A `RequestError` rendered as an HTML page instead of JSON.
#[derive(Debug)]
pub struct PageError(pub RequestError);

impl From<RequestError> for PageError {
    fn from(error: RequestError) -> Self {
        PageError(error)
    }
}

impl From<anyhow::Error> for PageError {
    fn from(error: anyhow::Error) -> Self {
        PageError(RequestError::Internal(error))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let title = match status {
            StatusCode::NOT_FOUND => "Page not found",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::BAD_REQUEST => "Bad request",
            StatusCode::UNAUTHORIZED => "Not logged in",
            _ => "Server error",
        };
        if status.is_server_error() {
            tracing::error!("Page failed: {:#}", self.0);
        }
        (status, render::error_page(title, &self.0.user_message())).into_response()
    }
}

pub(crate) fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    jar.add(
        Cookie::build(FLASH_COOKIE, urlencoding::encode(message).into_owned())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish(),
    )
}

/// Removes the pending notice, if any, and returns it.
pub(crate) fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let Some(value) = jar.get(FLASH_COOKIE).map(|cookie| cookie.value().to_owned()) else {
        return (jar, None);
    };
    let mut expired = Cookie::named(FLASH_COOKIE);
    expired.set_path("/");
    let message = urlencoding::decode(&value)
        .map(|message| message.into_owned())
        .map_err(|e| tracing::debug!("Dropping undecodable notice: {e}"))
        .ok();
    (jar.remove(expired), message)
}

pub(crate) fn redirect_with_notice(jar: CookieJar, to: &str, message: &str) -> (CookieJar, Redirect) {
    (set_flash(jar, message), Redirect::to(to))
}

/// Renders `body` inside the layout, consuming any pending notice.
pub(crate) fn render_page(
    jar: CookieJar,
    title: &str,
    user: Option<&AuthUser>,
    body: &str,
) -> (CookieJar, Html<String>) {
    let (jar, notice) = take_flash(jar);
    let html = render::layout(title, user, notice.as_deref(), body);
    (jar, html)
}

/// Like `AuthUser`, but anonymous visitors are sent to the login page.
pub struct LoginRequired(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for LoginRequired
where
    S: Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state)
            .await
            .map_err(|e| PageError(e).into_response())?;
        match user {
            Some(user) => Ok(LoginRequired(user)),
            None => {
                let jar = CookieJar::from_headers(&parts.headers);
                let login = format!(
                    "/accounts/login/?next={}",
                    urlencoding::encode(parts.uri.path())
                );
                Err(redirect_with_notice(jar, &login, "Please log in to see this page.").into_response())
            }
        }
    }
}
