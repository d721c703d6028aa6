use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: registration, login, and the
/// read-only blog surface. Logged-in viewers hit the same routes; the
/// `OptionalAuthUser` extractor upgrades them so the policy can apply the
/// author exemption (an author sees their own hidden posts in these feeds).
///
/// Visibility mandate: every post-returning handler here runs its rows
/// through the policy module, and a post the viewer may not see answers 404,
/// never 403.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Account creation; responds with a signed token.
        .route("/auth/register", post(handlers::register_user))
        // POST /auth/login
        // Credential check and token issuance.
        .route("/auth/login", post(handlers::login))
        // GET /posts?page=N
        // The paginated home feed, policy-filtered per viewer.
        .route("/posts", get(handlers::get_home_feed))
        // GET /posts/{id}
        // Post detail; 404 when the post is hidden from this viewer.
        .route("/posts/{id}", get(handlers::get_post_detail))
        // GET /posts/{id}/comments
        // Comments of a post, gated on the same visibility rule as the detail.
        .route("/posts/{id}/comments", get(handlers::get_post_comments))
        // GET /categories/{slug}/posts?page=N
        // Feed of one published category; unpublished categories 404.
        .route(
            "/categories/{slug}/posts",
            get(handlers::get_category_feed),
        )
        // GET /profiles/{username}
        // Public profile lookup.
        .route("/profiles/{username}", get(handlers::get_profile))
        // GET /profiles/{username}/posts?page=N
        // Profile feed; unfiltered when the owner views their own profile.
        .route(
            "/profiles/{username}/posts",
            get(handlers::get_profile_feed),
        )
}
