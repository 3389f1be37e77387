#![allow(dead_code)]

use std::time::Duration;

use recipe_box::{config::Config, get_random_free_port, make_router, run_app};
use reqwest::{redirect::Policy, Client, StatusCode};
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub client: Client,
}

/// Starts the server on a free port against a fresh SQLite file.
pub async fn spawn_app() -> TestApp {
    let (port, addr) = get_random_free_port().expect("no free port");
    let db_path = std::env::temp_dir().join(format!(
        "recipe_box_test_{}_{}.db",
        std::process::id(),
        port
    ));
    let _ = std::fs::remove_file(&db_path);
    let config = Config {
        database_url: format!("sqlite://{}", db_path.display()),
        jwt_secret: "test-secret".to_string(),
        bind_address: addr,
        page_size: 10,
    };
    tokio::spawn(run_app(make_router(), config));

    let app = TestApp {
        address: format!("http://{addr}"),
        client: Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("failed to build client"),
    };
    for _ in 0..100 {
        if let Ok(response) = app.client.get(app.url("/check_health")).send().await {
            if response.status() == StatusCode::OK {
                return app;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("server did not start on port {port}");
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers `username` and returns its token.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/users/"))
            .json(&json!({"user": {
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct-horse",
            }}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["user"]["token"].as_str().unwrap().to_string()
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Token {token}"));
        }
        request.send().await.unwrap()
    }

    pub async fn get_json(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.header("Authorization", format!("Token {token}"));
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    pub async fn create_recipe(&self, token: &str, title: &str, extra: Value) -> i64 {
        let mut body = json!({
            "title": title,
            "description": "Family favourite.",
            "ingredients": "200g spaghetti\n2 eggs",
            "instructions": "Cook. Mix. Serve.",
            "prep_time": 10,
            "cook_time": 20,
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        let response = self.post_json("/api/recipes/", Some(token), body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let recipe: Value = response.json().await.unwrap();
        recipe["id"].as_i64().unwrap()
    }
}
