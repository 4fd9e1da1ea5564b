// tests/user_tests.rs

mod common;

use common::{create_post, register_user, spawn_app};

#[tokio::test]
async fn me_reports_profile_and_counts() {
    let app = spawn_app().await;
    let user = register_user(&app).await;
    let fan = register_user(&app).await;

    create_post(&app, &user, "one").await;
    create_post(&app, &user, "two").await;
    app.client
        .post(format!("{}/follow/{}", app.address, user.id))
        .bearer_auth(&fan.token)
        .send()
        .await
        .unwrap();

    let me: serde_json::Value = app
        .client
        .get(format!("{}/user", app.address))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(me["username"], user.username);
    assert_eq!(me["postsCount"], 2);
    assert_eq!(me["followersCount"], 1);
    assert_eq!(me["followingCount"], 0);
    assert!(me["email"].as_str().unwrap().contains('@'));
}

#[tokio::test]
async fn search_matches_username_substring() {
    let app = spawn_app().await;
    let user = register_user(&app).await;

    // Usernames are unique and random; search for a distinctive chunk.
    let needle = &user.username[1..9];
    let results: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/search/{}", app.address, needle))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(
        results
            .iter()
            .any(|u| u["username"] == user.username.as_str()),
        "expected {} in search results",
        user.username
    );
}

#[tokio::test]
async fn recent_searches_deduplicate_and_clear() {
    let app = spawn_app().await;
    let searcher = register_user(&app).await;
    let found = register_user(&app).await;

    for _ in 0..2 {
        let response = app
            .client
            .post(format!("{}/recent/search/{}", app.address, found.id))
            .bearer_auth(&searcher.token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let recents: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/recent/search", app.address))
        .bearer_auth(&searcher.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(recents.len(), 1);
    assert_eq!(recents[0]["search"]["username"], found.username);

    let response = app
        .client
        .delete(format!("{}/recent/search", app.address))
        .bearer_auth(&searcher.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let recents: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/recent/search", app.address))
        .bearer_auth(&searcher.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(recents.is_empty());
}

#[tokio::test]
async fn avatar_upload_stores_and_replaces_the_file() {
    let app = spawn_app().await;
    let user = register_user(&app).await;

    let upload = |bytes: Vec<u8>| {
        let form = reqwest::multipart::Form::new().part(
            "image",
            reqwest::multipart::Part::bytes(bytes)
                .file_name("avatar.png")
                .mime_str("image/png")
                .unwrap(),
        );
        app.client
            .post(format!("{}/auth/avatar", app.address))
            .bearer_auth(&user.token)
            .multipart(form)
            .send()
    };

    let response = upload(vec![0u8; 128]).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let first_dest = body["avatarDest"].as_str().unwrap().to_string();
    assert!(first_dest.starts_with(&format!("uploads/{}/", user.id)));

    let first_path = std::path::Path::new(&app.upload_dir)
        .join(first_dest.strip_prefix("uploads/").unwrap());
    assert!(first_path.exists());

    // A second upload replaces the file on disk.
    let response = upload(vec![1u8; 128]).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(!first_path.exists());

    // Removing the avatar unlinks the current file as well.
    let response = app
        .client
        .delete(format!("{}/auth/avatar", app.address))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let me: serde_json::Value = app
        .client
        .get(format!("{}/user", app.address))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(me["avatarDest"].is_null());
}

#[tokio::test]
async fn avatar_upload_rejects_wrong_mime() {
    let app = spawn_app().await;
    let user = register_user(&app).await;

    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(vec![0u8; 16])
            .file_name("clip.mp4")
            .mime_str("video/mp4")
            .unwrap(),
    );
    let response = app
        .client
        .post(format!("{}/auth/avatar", app.address))
        .bearer_auth(&user.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn upload_delete_enforces_the_ownership_prefix() {
    let app = spawn_app().await;
    let owner = register_user(&app).await;
    let thief = register_user(&app).await;

    let form = reqwest::multipart::Form::new().part(
        "post_media",
        reqwest::multipart::Part::bytes(vec![0u8; 64])
            .file_name("photo.jpg")
            .mime_str("image/jpeg")
            .unwrap(),
    );
    let response = app
        .client
        .post(format!("{}/upload", app.address))
        .bearer_auth(&owner.token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let files: Vec<serde_json::Value> = response.json().await.unwrap();
    let name = files[0]["name"].as_str().unwrap().to_string();
    assert!(name.starts_with(&format!("{}_", owner.id)));

    // Someone else cannot delete it.
    let response = app
        .client
        .delete(format!("{}/upload/{}", app.address, name))
        .bearer_auth(&thief.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // The owner can.
    let response = app
        .client
        .delete(format!("{}/upload/{}", app.address, name))
        .bearer_auth(&owner.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn deleting_the_account_cascades_everything() {
    let app = spawn_app().await;
    let doomed = register_user(&app).await;
    let bystander = register_user(&app).await;

    let post_id = create_post(&app, &doomed, "will vanish").await;
    app.client
        .post(format!("{}/follow/{}", app.address, doomed.id))
        .bearer_auth(&bystander.token)
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .delete(format!("{}/user", app.address))
        .bearer_auth(&doomed.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // Login is gone.
    let response = app
        .client
        .post(format!("{}/auth/login", app.address))
        .json(&serde_json::json!({ "login": doomed.username, "password": "Passw0rd&" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Profile and posts are gone.
    let response = app
        .client
        .get(format!("{}/user/{}", app.address, doomed.username))
        .bearer_auth(&bystander.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = app
        .client
        .get(format!("{}/posts/{}", app.address, post_id))
        .bearer_auth(&bystander.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Follow edges pointing at the account are gone too.
    let edges: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM followers WHERE user_id = $1 OR follow_to = $1",
    )
    .bind(doomed.id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(edges, 0);
}
