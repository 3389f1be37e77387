pub mod aggregates;
pub mod authentication;
pub mod config;
pub mod data_formats;
mod db_helpers;
pub mod errors;
mod extractors;
mod handlers;
pub mod models;
mod pages;

use std::{
    net::{SocketAddr, TcpListener},
    str::FromStr,
    sync::Arc,
};

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
use config::Config;
use handlers::*;
use pages::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use tower_http::trace::TraceLayer;

pub type JsonResponse<T> = (StatusCode, Json<T>);

pub async fn run_app(app: Router, config: Config) -> Result<()> {
    let db = init_db(&config.database_url).await?;
    let address = config.bind_address;
    let app = app
        .layer(Extension(Arc::new(db)))
        .layer(Extension(Arc::new(config)))
        .layer(TraceLayer::new_for_http());
    tracing::info!("Listening on {}", address);
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await
        .context("Server error")?;
    Ok(())
}

/// Creates the database file if needed, then applies pending migrations.
pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!("Creating database {}", db_url);
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {db_url}"))?;
    } else {
        tracing::debug!("Database already exists");
    }
    let options = SqliteConnectOptions::from_str(db_url)
        .context("Invalid DATABASE_URL")?
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations completed");
    Ok(pool)
}

pub fn get_random_free_port() -> Result<(u16, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").context("Could not bind a free port")?;
    let addr = listener.local_addr().context("Could not get a free port")?;
    Ok((addr.port(), addr))
}

pub fn make_router() -> Router {
    let api = Router::new()
        // accounts
        .route("/users/", post(register_user))
        .route("/users/login/", post(login_user))
        .route("/user/", get(get_current_user).put(update_current_profile))
        .route("/profiles/:username/", get(get_profile))
        // recipes
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id/",
            get(get_recipe)
                .put(replace_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
        .route("/recipes/:id/comments/", get(list_recipe_comments))
        .route("/recipes/:id/add_comment/", post(add_recipe_comment))
        .route("/recipes/:id/ratings/", get(list_recipe_ratings))
        .route("/recipes/:id/add_rating/", post(add_recipe_rating))
        .route("/recipes/:id/average_rating/", get(get_average_rating))
        // categories and tags
        .route("/categories/", get(list_categories).post(create_category))
        .route(
            "/categories/:id/",
            get(get_category)
                .put(replace_category)
                .patch(patch_category)
                .delete(delete_category),
        )
        .route("/categories/:id/recipes/", get(list_category_recipes))
        .route("/tags/", get(list_tags).post(create_tag))
        .route("/tags/:id/", get(get_tag))
        // comments and ratings
        .route("/comments/", get(list_comments).post(create_comment))
        .route(
            "/comments/:id/",
            get(get_comment)
                .put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .route("/ratings/", get(list_ratings).post(create_rating))
        .route(
            "/ratings/:id/",
            get(get_rating)
                .put(update_rating)
                .patch(update_rating)
                .delete(delete_rating),
        );

    Router::new()
        .route("/check_health", get(alive))
        .route("/", get(home_page))
        .route("/recipe/create/", get(create_recipe_page).post(create_recipe_submit))
        .route("/recipe/:id/", get(recipe_page).post(recipe_page_action))
        .route("/recipe/:id/edit/", get(edit_recipe_page).post(edit_recipe_submit))
        .route("/categories/", get(categories_page))
        .route("/category/:id/", get(category_page))
        .route("/tag/:id/", get(tag_page))
        .route("/profile/edit/", get(edit_profile_page).post(edit_profile_submit))
        .route("/profile/:username/", get(profile_page))
        .route("/register/", get(register_page).post(register_submit))
        .route("/accounts/login/", get(login_page).post(login_submit))
        .route("/accounts/logout/", get(logout).post(logout))
        .nest("/api", api)
        .fallback(not_found)
}
