use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use sqlx::SqlitePool;

use crate::{
    authentication::{
        get_jwt_token, hash_password_argon2, verify_password_argon2, AuthUser,
    },
    config::Config,
    data_formats::{
        LoginRequest, ProfileResponse, ProfileWrapper, RegisterRequest, UpdateProfileRequest,
        UserResponse, UserWrapper,
    },
    db_helpers::{
        get_or_create_profile, get_profile_by_username, get_user_by_id, get_user_by_username,
        insert_user, update_profile_in_db,
    },
    errors::RequestError,
    extractors::ValidatedJson,
};

use super::{CreatedResult, JsonResult};

type UserJson = UserWrapper<UserResponse>;

// ----------------- User Handlers -----------------
pub async fn register_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    ValidatedJson(UserWrapper { mut user }): ValidatedJson<UserWrapper<RegisterRequest>>,
) -> CreatedResult<UserJson> {
    user.password = hash_password_argon2(user.password).await?;
    let user = insert_user(&pool, &user).await?;
    tracing::info!(user_id = user.id, "registered {}", user.username);

    let token = get_jwt_token(user.id, &user.username, &config.jwt_secret)?;
    Ok((
        StatusCode::CREATED,
        Json(UserWrapper::wrap_with_user_data(UserResponse::new(user, token))),
    ))
}

pub async fn login_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    ValidatedJson(UserWrapper { user: request }): ValidatedJson<UserWrapper<LoginRequest>>,
) -> JsonResult<UserJson> {
    let user = match get_user_by_username(&pool, &request.username).await? {
        Some(user) => user,
        None => {
            return Err(RequestError::invalid_field(
                "credentials",
                "Unable to log in with provided credentials.",
            ))
        }
    };
    if !verify_password_argon2(request.password, &user.password).await? {
        return Err(RequestError::invalid_field(
            "credentials",
            "Unable to log in with provided credentials.",
        ));
    }
    let token = get_jwt_token(user.id, &user.username, &config.jwt_secret)?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn get_current_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id, token, .. }: AuthUser,
) -> JsonResult<UserJson> {
    let user = get_user_by_id(&pool, id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    Ok(Json(UserWrapper::wrap_with_user_data(UserResponse::new(
        user, token,
    ))))
}

pub async fn update_current_profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    ValidatedJson(UserWrapper { user: request }): ValidatedJson<UserWrapper<UpdateProfileRequest>>,
) -> JsonResult<ProfileWrapper> {
    let profile = update_profile_in_db(&pool, user.id, request).await?;
    Ok(Json(ProfileWrapper {
        profile: ProfileResponse::from(profile),
    }))
}
// ----------------- End User Handlers -----------------

// ----------------- Profile Handlers -----------------
pub async fn get_profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    _viewer: AuthUser,
    Path(username): Path<String>,
) -> JsonResult<ProfileWrapper> {
    let profile = match get_profile_by_username(&pool, &username).await? {
        Some(profile) => profile,
        None => {
            // Accounts that predate profiles get one on first view.
            let user = get_user_by_username(&pool, &username)
                .await?
                .ok_or(RequestError::NotFound("User not found"))?;
            get_or_create_profile(&pool, user.id).await?
        }
    };
    Ok(Json(ProfileWrapper {
        profile: ProfileResponse::from(profile),
    }))
}
