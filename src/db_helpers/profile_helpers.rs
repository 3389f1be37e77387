use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::UpdateProfileRequest, errors::RequestError, models::Profile};

const PROFILE_QUERY: &str = r#"
    SELECT profiles.id,
           profiles.user_id,
           users.username,
           users.email,
           profiles.bio,
           profiles.avatar,
           profiles.location,
           profiles.website,
           profiles.followers_count,
           profiles.following_count
    FROM   profiles
           JOIN users ON users.id = profiles.user_id
"#;

pub async fn get_profile_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<Profile>, RequestError> {
    let result =
        sqlx::query_as::<Sqlite, Profile>(&format!("{PROFILE_QUERY} WHERE users.username = $1"))
            .bind(username)
            .fetch_optional(pool)
            .await?;
    Ok(result)
}

/// Loads the user's profile, creating an empty one first if it is missing.
pub async fn get_or_create_profile(pool: &SqlitePool, user_id: i64) -> Result<Profile, RequestError> {
    sqlx::query("INSERT INTO profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;
    sqlx::query_as::<Sqlite, Profile>(&format!("{PROFILE_QUERY} WHERE profiles.user_id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RequestError::NotFound("User not found"))
}

/// Absent fields are left alone; an empty string clears an optional link.
pub async fn update_profile_in_db(
    pool: &SqlitePool,
    user_id: i64,
    UpdateProfileRequest {
        bio,
        avatar,
        location,
        website,
    }: UpdateProfileRequest,
) -> Result<Profile, RequestError> {
    get_or_create_profile(pool, user_id).await?;
    sqlx::query(
        r#"
        UPDATE profiles
        SET    bio = COALESCE($1, bio),
               avatar = CASE WHEN $2 IS NULL THEN avatar ELSE NULLIF($2, '') END,
               location = CASE WHEN $3 IS NULL THEN location ELSE NULLIF($3, '') END,
               website = CASE WHEN $4 IS NULL THEN website ELSE NULLIF($4, '') END
        WHERE  user_id = $5
        "#,
    )
    .bind(bio)
    .bind(avatar)
    .bind(location)
    .bind(website)
    .bind(user_id)
    .execute(pool)
    .await?;
    get_or_create_profile(pool, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::test_support::*;

    #[tokio::test]
    async fn partial_profile_update() {
        let pool = test_pool().await;
        let id = create_user(&pool, "cook_sarah").await;
        let profile = update_profile_in_db(
            &pool,
            id,
            UpdateProfileRequest {
                bio: Some("Tacos every day".into()),
                website: Some("https://example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(profile.bio, "Tacos every day");
        assert_eq!(profile.website.as_deref(), Some("https://example.com"));

        let profile = update_profile_in_db(
            &pool,
            id,
            UpdateProfileRequest {
                website: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(profile.bio, "Tacos every day");
        assert_eq!(profile.website, None);
    }
}
