mod common;

use common::{spawn_app, TestApp};
use reqwest::{header, Response, StatusCode};
use serde_json::{json, Value};

fn cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            let pair = value.split(';').next()?;
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name && !value.is_empty()).then(|| value.to_string())
        })
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Logs an existing account in through the login form.
async fn page_login(app: &TestApp, username: &str) -> String {
    let response = app
        .client
        .post(app.url("/accounts/login/"))
        .form(&[("username", username), ("password", "correct-horse"), ("next", "/")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    cookie(&response, "session").expect("login sets the session cookie")
}

async fn get_page(app: &TestApp, path: &str, session: Option<&str>) -> Response {
    let mut request = app.client.get(app.url(path));
    if let Some(session) = session {
        request = request.header(header::COOKIE, format!("session={session}"));
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn home_lists_and_searches_recipes() {
    let app = spawn_app().await;
    let token = app.register("chef_mario").await;
    app.create_recipe(&token, "Spaghetti Carbonara", json!({})).await;
    app.create_recipe(&token, "Fish Tacos", json!({})).await;

    let response = get_page(&app, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Spaghetti Carbonara"));
    assert!(html.contains("Fish Tacos"));

    let html = get_page(&app, "/?q=tacos", None).await.text().await.unwrap();
    assert!(html.contains("Fish Tacos"));
    assert!(!html.contains("Spaghetti Carbonara"));

    let response = get_page(&app, "/?page=5", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_submissions_are_sent_to_login() {
    let app = spawn_app().await;
    let token = app.register("chef_mario").await;
    let recipe_id = app.create_recipe(&token, "Carbonara", json!({})).await;

    let response = app
        .client
        .post(app.url(&format!("/recipe/{recipe_id}/")))
        .form(&[("text", "Looks great")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login/");
    assert!(cookie(&response, "flash").is_some());

    let response = get_page(&app, "/profile/chef_mario/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/accounts/login/?next="));
}

#[tokio::test]
async fn create_recipe_with_inline_tags() {
    let app = spawn_app().await;
    app.register("chef_mario").await;
    let session = page_login(&app, "chef_mario").await;

    let response = app
        .client
        .post(app.url("/recipe/create/"))
        .header(header::COOKIE, format!("session={session}"))
        .form(&[
            ("title", "Weeknight Chili"),
            ("description", "Hearty."),
            ("ingredients", "Beans\nTomatoes"),
            ("instructions", "Simmer for an hour."),
            ("category_id", ""),
            ("tags", "Spicy, Quick"),
            ("prep_time", "15"),
            ("cook_time", "60"),
            ("servings", "6"),
            ("difficulty", "easy"),
            ("published", "on"),
            ("image", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("/recipe/"));
    let flash = cookie(&response, "flash").unwrap();

    let response = app
        .client
        .get(app.url(&target))
        .header(header::COOKIE, format!("session={session}; flash={flash}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Weeknight Chili"));
    assert!(html.contains("Recipe created!"));
    assert!(html.contains("Spicy"));
    assert!(html.contains("Total 75 min"));

    let (_, tags) = app.get_json("/api/tags/", None).await;
    assert_eq!(tags["count"], 2);
}

#[tokio::test]
async fn invalid_recipe_form_redirects_back_with_notice() {
    let app = spawn_app().await;
    app.register("chef_mario").await;
    let session = page_login(&app, "chef_mario").await;
    let response = app
        .client
        .post(app.url("/recipe/create/"))
        .header(header::COOKIE, format!("session={session}"))
        .form(&[("title", ""), ("servings", "0")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/recipe/create/");
    assert!(cookie(&response, "flash").is_some());

    let (_, recipes) = app.get_json("/api/recipes/", None).await;
    assert_eq!(recipes["count"], 0);
}

#[tokio::test]
async fn comment_and_rate_from_the_recipe_page() {
    let app = spawn_app().await;
    let chef = app.register("chef_mario").await;
    let recipe_id = app.create_recipe(&chef, "Carbonara", json!({})).await;
    app.register("cook_sarah").await;
    let session = page_login(&app, "cook_sarah").await;
    let path = format!("/recipe/{recipe_id}/");

    let post = |form: Vec<(&'static str, &'static str)>| {
        app.client
            .post(app.url(&path))
            .header(header::COOKIE, format!("session={session}"))
            .form(&form)
            .send()
    };
    let response = post(vec![("text", "Creamy and perfect")]).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), path);
    post(vec![("score", "3")]).await.unwrap();
    post(vec![("score", "5")]).await.unwrap();

    let html = get_page(&app, &path, None).await.text().await.unwrap();
    assert!(html.contains("Creamy and perfect"));
    assert!(html.contains("5.0 / 5"));

    let (_, ratings): (_, Value) = app
        .get_json(&format!("/api/recipes/{recipe_id}/ratings/"), None)
        .await;
    assert_eq!(ratings.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_the_author_reaches_the_edit_page() {
    let app = spawn_app().await;
    let token = app.register("chef_mario").await;
    app.register("cook_sarah").await;
    let chef_session = page_login(&app, "chef_mario").await;
    let cook_session = page_login(&app, "cook_sarah").await;
    let recipe_id = app.create_recipe(&token, "Carbonara", json!({})).await;
    let path = format!("/recipe/{recipe_id}/edit/");

    let response = get_page(&app, &path, Some(&cook_session)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = get_page(&app, &path, Some(&chef_session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("Carbonara"));
}

#[tokio::test]
async fn edit_form_clears_blank_times() {
    let app = spawn_app().await;
    let token = app.register("chef_mario").await;
    let session = page_login(&app, "chef_mario").await;
    let recipe_id = app.create_recipe(&token, "Carbonara", json!({})).await;

    let response = app
        .client
        .post(app.url(&format!("/recipe/{recipe_id}/edit/")))
        .header(header::COOKIE, format!("session={session}"))
        .form(&[
            ("title", "Carbonara"),
            ("description", "Family favourite."),
            ("ingredients", "200g spaghetti\n2 eggs"),
            ("instructions", "Cook. Mix. Serve."),
            ("category_id", ""),
            ("tags", ""),
            ("prep_time", ""),
            ("cook_time", "5"),
            ("servings", "2"),
            ("difficulty", "easy"),
            ("published", "on"),
            ("image", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/recipe/{recipe_id}/"));

    let (_, recipe) = app
        .get_json(&format!("/api/recipes/{recipe_id}/"), Some(&token))
        .await;
    assert_eq!(recipe["prep_time"], Value::Null);
    assert_eq!(recipe["cook_time"], 5);
    assert_eq!(recipe["total_time"], 5);
}

#[tokio::test]
async fn profile_can_be_edited() {
    let app = spawn_app().await;
    app.register("chef_mario").await;
    let session = page_login(&app, "chef_mario").await;

    let response = app
        .client
        .post(app.url("/profile/edit/"))
        .header(header::COOKIE, format!("session={session}"))
        .form(&[
            ("bio", "Pasta every day."),
            ("avatar", ""),
            ("location", "Rome"),
            ("website", "not a url"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/profile/edit/");

    let response = app
        .client
        .post(app.url("/profile/edit/"))
        .header(header::COOKIE, format!("session={session}"))
        .form(&[
            ("bio", "Pasta every day."),
            ("avatar", ""),
            ("location", "Rome"),
            ("website", "https://example.com"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/profile/chef_mario/");

    let html = get_page(&app, "/profile/chef_mario/", Some(&session))
        .await
        .text()
        .await
        .unwrap();
    assert!(html.contains("Pasta every day."));
    assert!(html.contains("Rome"));
}

#[tokio::test]
async fn register_page_creates_an_account() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/register/"))
        .form(&[
            ("username", "new_cook"),
            ("email", "new@example.com"),
            ("password1", "correct-horse"),
            ("password2", "correct-horse"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login/");

    let response = app
        .client
        .post(app.url("/register/"))
        .form(&[
            ("username", "other_cook"),
            ("email", "other@example.com"),
            ("password1", "correct-horse"),
            ("password2", "different-horse"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/register/");
}
