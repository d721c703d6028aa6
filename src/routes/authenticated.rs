use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Routes for users with a validated session: authoring posts, commenting,
/// profile management and the image upload pipeline.
///
/// Access control strategy: the `AuthUser` extractor layer above this module
/// guarantees an authenticated identity; the handlers then run the policy
/// module's ownership checks (visible-but-not-owned answers 403, invisible
/// answers 404).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The session user's own profile.
        .route("/me", get(handlers::get_me))
        // GET /me/posts
        // Everything the user authored, drafts and scheduled posts included.
        .route("/me/posts", get(handlers::get_my_posts))
        // PUT /me/profile
        // Edits the session user's profile; the target is always the caller.
        .route("/me/profile", put(handlers::update_profile))
        // --- Authoring ---
        // POST /posts
        // Submits a new post; the author is fixed to the session user.
        .route("/posts", post(handlers::create_post))
        // PUT/DELETE /posts/{id}
        // Edit or remove an owned post. Deletion cascades to its comments.
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // --- Commenting ---
        // POST /posts/{id}/comments
        // Comments on a post the caller can see.
        .route("/posts/{id}/comments", post(handlers::add_comment))
        // PUT/DELETE /comments/{id}
        // Edit or remove an owned comment.
        .route(
            "/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        // --- Media ---
        // POST /upload/presigned
        // Short-lived direct-to-storage upload URL for a post image.
        .route("/upload/presigned", post(handlers::get_presigned_upload_url))
}
