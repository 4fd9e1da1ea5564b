// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{auth, comments, follow, posts, recent, upload, users},
    state::AppState,
    utils::{jwt::auth_middleware, media::MAX_FILE_BYTES},
};

/// Assembles the main application router.
///
/// * Public routes: register, login, availability check, static uploads.
/// * Everything else sits behind the JWT middleware.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/check", post(auth::check_is_free))
        .merge(
            Router::new()
                .route(
                    "/avatar",
                    post(auth::upload_avatar).delete(auth::remove_avatar),
                )
                .layer(DefaultBodyLimit::max(MAX_FILE_BYTES + 1024 * 1024))
                .layer(auth_layer.clone()),
        );

    let follow_routes = Router::new()
        .route("/{id}", post(follow::follow_user).delete(follow::unfollow))
        .route("/follower/{id}", delete(follow::remove_follower))
        .route("/followers/{username}", get(follow::get_followers))
        .route("/following/{username}", get(follow::get_following));

    let search_routes = Router::new().route("/{text}", get(users::search_users));

    let recent_routes = Router::new()
        .route("/search", get(recent::get_recents).delete(recent::remove_all))
        .route(
            "/search/{id}",
            post(recent::add_to_recent).delete(recent::remove_recent),
        );

    let post_routes = Router::new()
        .route("/", post(posts::create_post).get(posts::feed))
        .route(
            "/{id}",
            get(posts::get_post)
                .patch(posts::edit_post)
                .delete(posts::delete_post),
        )
        .route("/like/{id}", post(posts::add_like).delete(posts::remove_like))
        .route("/save/{id}", post(posts::add_save).delete(posts::remove_save));

    let user_routes = Router::new()
        .route("/", get(users::get_me).delete(users::delete_account))
        .route("/saved", get(posts::get_saved_posts))
        .route("/posts/{username}", get(posts::get_user_posts))
        .route("/reels/{username}", get(posts::get_user_reels))
        .route("/{username}", get(users::get_profile));

    let comment_routes = Router::new()
        .route(
            "/{id}",
            post(comments::create_comment)
                .get(comments::get_post_comments)
                .delete(comments::remove_comment),
        )
        .route(
            "/like/{id}",
            post(comments::add_like).delete(comments::remove_like),
        );

    let reply_routes = Router::new().route(
        "/{id}",
        post(comments::reply).get(comments::get_comment_replies),
    );

    let upload_routes = Router::new()
        .route(
            "/",
            post(upload::upload_post_media).delete(upload::delete_files),
        )
        .route("/{name}", delete(upload::delete_file))
        .layer(DefaultBodyLimit::max(10 * MAX_FILE_BYTES + 1024 * 1024));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/follow", follow_routes.layer(auth_layer.clone()))
        .nest("/search", search_routes.layer(auth_layer.clone()))
        .nest("/recent", recent_routes.layer(auth_layer.clone()))
        .nest("/posts", post_routes.layer(auth_layer.clone()))
        .nest("/user", user_routes.layer(auth_layer.clone()))
        .nest("/comment", comment_routes.layer(auth_layer.clone()))
        .nest("/reply", reply_routes.layer(auth_layer.clone()))
        .nest("/upload", upload_routes.layer(auth_layer))
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
