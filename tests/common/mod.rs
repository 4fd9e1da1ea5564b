// tests/common/mod.rs
#![allow(dead_code)]

use photogram::{config::Config, routes, state::AppState};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
    pub upload_dir: String,
}

/// Spawns the app on a random port against the DATABASE_URL database,
/// with a throwaway upload directory. Returns the running app handle.
pub async fn spawn_app() -> TestApp {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let upload_dir = std::env::temp_dir()
        .join(format!("photogram_test_{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .to_string();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .expect("Failed to create test upload dir");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        upload_dir: upload_dir.clone(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
        upload_dir,
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

/// Registers a fresh user with a unique name and returns its credentials.
pub async fn register_user(app: &TestApp) -> TestUser {
    let username = format!("u{}", &uuid::Uuid::new_v4().simple().to_string()[..10]);
    let email = format!("{}@example.com", username);

    let response = app
        .client
        .post(format!("{}/auth/register", app.address))
        .json(&serde_json::json!({
            "email": email,
            "username": username,
            "password": "Passw0rd&"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    TestUser {
        id: body["user"]["id"].as_i64().expect("user id missing"),
        username,
        token: body["token"].as_str().expect("token missing").to_string(),
    }
}

/// Creates a post as `user` and returns its ID. The media name is
/// fabricated with the user's ownership prefix; post creation does not
/// require the file to exist on disk.
pub async fn create_post(app: &TestApp, user: &TestUser, text: &str) -> i64 {
    let media_name = format!("{}_abc123_1700000000000.jpg", user.id);

    let response = app
        .client
        .post(format!("{}/posts", app.address))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({
            "text": text,
            "aspect": 1.0,
            "media": [{ "name": media_name, "type": "image", "transform": "" }]
        }))
        .send()
        .await
        .expect("Create post failed");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().expect("post id missing")
}

/// Creates a top-level comment and returns its ID.
pub async fn create_comment(app: &TestApp, user: &TestUser, post_id: i64, text: &str) -> i64 {
    let response = app
        .client
        .post(format!("{}/comment/{}", app.address, post_id))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await
        .expect("Create comment failed");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().expect("comment id missing")
}
