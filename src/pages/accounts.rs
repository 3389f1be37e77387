use std::sync::Arc;

use axum::{response::Redirect, Extension};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    authentication::{
        get_jwt_token, hash_password_argon2, session_cookie, verify_password_argon2, MaybeUser,
        SESSION_COOKIE,
    },
    config::Config,
    data_formats::RegisterRequest,
    db_helpers::{get_user_by_username, insert_user},
    errors::RequestError,
    extractors::{PageForm, QueryParams},
};

use super::{redirect_with_notice, render, render_page, PageResult, RedirectResult};

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct NextParams {
    #[serde(default)]
    pub next: Option<String>,
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/",
    }
}

pub async fn register_page(MaybeUser(user): MaybeUser, jar: CookieJar) -> PageResult {
    Ok(render_page(jar, "Register", user.as_ref(), render::register_form()))
}

pub async fn register_submit(
    Extension(pool): Extension<Arc<SqlitePool>>,
    jar: CookieJar,
    PageForm(form): PageForm<RegisterForm>,
) -> RedirectResult {
    if form.password1 != form.password2 {
        return Ok(redirect_with_notice(
            jar,
            "/register/",
            "The two password fields didn't match.",
        ));
    }
    let mut request = RegisterRequest {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password1,
    };
    if let Err(errors) = request.validate() {
        let error = RequestError::from(errors);
        return Ok(redirect_with_notice(jar, "/register/", &error.user_message()));
    }

    request.password = hash_password_argon2(request.password).await?;
    match insert_user(&pool, &request).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "registered {} from page", user.username);
            Ok(redirect_with_notice(
                jar,
                "/accounts/login/",
                "Account created! You can now log in.",
            ))
        }
        Err(e @ RequestError::Validation(_)) => {
            Ok(redirect_with_notice(jar, "/register/", &e.user_message()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login_page(
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    QueryParams(params): QueryParams<NextParams>,
) -> PageResult {
    let body = render::login_form(params.next.as_deref());
    Ok(render_page(jar, "Log in", user.as_ref(), &body))
}

pub async fn login_submit(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    jar: CookieJar,
    PageForm(form): PageForm<LoginForm>,
) -> RedirectResult {
    let LoginForm {
        username,
        password,
        next,
    } = form;
    let verified = match get_user_by_username(&pool, username.trim()).await? {
        Some(user) => verify_password_argon2(password, &user.password)
            .await?
            .then_some(user),
        None => None,
    };
    let Some(user) = verified else {
        return Ok(redirect_with_notice(
            jar,
            "/accounts/login/",
            "Please enter a correct username and password.",
        ));
    };
    let token = get_jwt_token(user.id, &user.username, &config.jwt_secret)?;
    tracing::debug!(user_id = user.id, "page login");
    let jar = jar.add(session_cookie(token));
    Ok((jar, Redirect::to(safe_next(next.as_deref()))))
}

pub async fn logout(jar: CookieJar) -> RedirectResult {
    let mut session = Cookie::named(SESSION_COOKIE);
    session.set_path("/");
    Ok(redirect_with_notice(jar.remove(session), "/", "You have been logged out."))
}
