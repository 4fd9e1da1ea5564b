// tests/comment_tests.rs

mod common;

use common::{create_comment, create_post, register_user, spawn_app};

#[tokio::test]
async fn comment_pages_are_counted_and_bounded() {
    let app = spawn_app().await;
    let user = register_user(&app).await;
    let post_id = create_post(&app, &user, "discuss").await;

    for i in 1..=5 {
        create_comment(&app, &user, post_id, &format!("comment {}", i)).await;
    }

    // 5 comments at 2 per page -> 3 pages
    let page: serde_json::Value = app
        .client
        .get(format!("{}/comment/{}?page=1&limit=2", app.address, post_id))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["pages"], 3);
    assert_eq!(page["commentsCount"], 5);
    assert_eq!(page["comments"].as_array().unwrap().len(), 2);
    // Newest first
    assert_eq!(page["comments"][0]["text"], "comment 5");

    // Requesting a page beyond the last is rejected.
    let response = app
        .client
        .get(format!("{}/comment/{}?page=4&limit=2", app.address, post_id))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn reply_counts_are_annotated_per_page() {
    let app = spawn_app().await;
    let user = register_user(&app).await;
    let post_id = create_post(&app, &user, "threads").await;

    let busy = create_comment(&app, &user, post_id, "busy comment").await;
    create_comment(&app, &user, post_id, "quiet comment").await;

    for i in 1..=3 {
        let response = app
            .client
            .post(format!("{}/reply/{}", app.address, busy))
            .bearer_auth(&user.token)
            .json(&serde_json::json!({ "text": format!("reply {}", i) }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    let page: serde_json::Value = app
        .client
        .get(format!("{}/comment/{}", app.address, post_id))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let comments = page["comments"].as_array().unwrap();
    // Replies never show up in the top-level listing.
    assert_eq!(comments.len(), 2);
    let by_text = |text: &str| {
        comments
            .iter()
            .find(|c| c["text"] == text)
            .unwrap_or_else(|| panic!("comment '{}' missing", text))
    };
    assert_eq!(by_text("busy comment")["repliesCount"], 3);
    assert_eq!(by_text("quiet comment")["repliesCount"], 0);
}

#[tokio::test]
async fn replies_list_oldest_first() {
    let app = spawn_app().await;
    let user = register_user(&app).await;
    let post_id = create_post(&app, &user, "ordering").await;
    let parent = create_comment(&app, &user, post_id, "parent").await;

    for i in 1..=3 {
        app.client
            .post(format!("{}/reply/{}", app.address, parent))
            .bearer_auth(&user.token)
            .json(&serde_json::json!({ "text": format!("reply {}", i) }))
            .send()
            .await
            .unwrap();
    }

    let page: serde_json::Value = app
        .client
        .get(format!("{}/reply/{}", app.address, parent))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(page["repliesCount"], 3);
    let replies = page["replies"].as_array().unwrap();
    assert_eq!(replies[0]["text"], "reply 1");
    assert_eq!(replies[2]["text"], "reply 3");
}

#[tokio::test]
async fn replying_to_a_reply_attaches_to_the_top_level_parent() {
    let app = spawn_app().await;
    let user = register_user(&app).await;
    let post_id = create_post(&app, &user, "flat threads").await;
    let top = create_comment(&app, &user, post_id, "top").await;

    let reply: serde_json::Value = app
        .client
        .post(format!("{}/reply/{}", app.address, top))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "text": "first level" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let reply_id = reply["id"].as_i64().unwrap();
    assert_eq!(reply["parentId"].as_i64(), Some(top));

    // Replying to the reply lands on the same top-level parent.
    let nested: serde_json::Value = app
        .client
        .post(format!("{}/reply/{}", app.address, reply_id))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "text": "would be second level" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(nested["parentId"].as_i64(), Some(top));
    assert_eq!(nested["postId"].as_i64(), Some(post_id));
}

#[tokio::test]
async fn deleting_a_comment_removes_replies_but_not_siblings() {
    let app = spawn_app().await;
    let user = register_user(&app).await;
    let post_id = create_post(&app, &user, "cleanup").await;

    let doomed = create_comment(&app, &user, post_id, "doomed").await;
    let sibling = create_comment(&app, &user, post_id, "sibling").await;
    app.client
        .post(format!("{}/reply/{}", app.address, doomed))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "text": "doomed reply" }))
        .send()
        .await
        .unwrap();

    let response = app
        .client
        .delete(format!("{}/comment/{}", app.address, doomed))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);

    let page: serde_json::Value = app
        .client
        .get(format!("{}/comment/{}", app.address, post_id))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["commentsCount"], 1);
    assert_eq!(page["comments"][0]["id"].as_i64(), Some(sibling));
}

#[tokio::test]
async fn only_the_author_can_delete_a_comment() {
    let app = spawn_app().await;
    let author = register_user(&app).await;
    let stranger = register_user(&app).await;
    let post_id = create_post(&app, &author, "protected").await;
    let comment_id = create_comment(&app, &author, post_id, "mine").await;

    let response = app
        .client
        .delete(format!("{}/comment/{}", app.address, comment_id))
        .bearer_auth(&stranger.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn comment_likes_are_idempotent_and_flagged() {
    let app = spawn_app().await;
    let user = register_user(&app).await;
    let post_id = create_post(&app, &user, "likes").await;
    let comment_id = create_comment(&app, &user, post_id, "likeable").await;

    for _ in 0..2 {
        let response = app
            .client
            .post(format!("{}/comment/like/{}", app.address, comment_id))
            .bearer_auth(&user.token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let page: serde_json::Value = app
        .client
        .get(format!("{}/comment/{}", app.address, post_id))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["comments"][0]["likesCount"], 1);
    assert_eq!(page["comments"][0]["liked"], true);

    // Unliking twice stays a success and drops the count to zero once.
    for _ in 0..2 {
        let response = app
            .client
            .delete(format!("{}/comment/like/{}", app.address, comment_id))
            .bearer_auth(&user.token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let page: serde_json::Value = app
        .client
        .get(format!("{}/comment/{}", app.address, post_id))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["comments"][0]["likesCount"], 0);
    assert_eq!(page["comments"][0]["liked"], false);
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_not_found() {
    let app = spawn_app().await;
    let user = register_user(&app).await;

    let response = app
        .client
        .post(format!("{}/comment/999999999", app.address))
        .bearer_auth(&user.token)
        .json(&serde_json::json!({ "text": "into the void" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
