use crate::{
    AppState, auth,
    auth::{AuthUser, OptionalAuthUser},
    models::{
        self, AuthResponse, CategoryFeed, Comment, CreateCommentRequest, CreatePostRequest,
        FeedPage, LoginRequest, Post, PresignedUrlRequest, PresignedUrlResponse, RegisterRequest,
        UpdateCommentRequest, UpdatePostRequest, UpdateProfileRequest, User,
    },
    policy::{self, Viewer},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Query Parameters ---

/// FeedQuery
///
/// Accepted query parameters for the feed endpoints. Out-of-range pages clamp
/// rather than fail.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct FeedQuery {
    /// 1-based page number; defaults to the first page.
    pub page: Option<u32>,
}

// --- Helpers ---

/// Turns an already-filtered, already-ordered candidate list into one response
/// page. Filtering has happened by the time this runs; paginating first would
/// undercount pages.
fn build_feed_page(posts: Vec<Post>, requested_page: Option<u32>) -> FeedPage {
    let page_size = policy::FEED_PAGE_SIZE;
    let total = posts.len();
    let requested = requested_page.unwrap_or(1) as usize;
    let slice = policy::paginate(&posts, page_size, requested);
    FeedPage {
        posts: slice.to_vec(),
        page: policy::effective_page(total, page_size, requested) as u32,
        page_size: page_size as u32,
        page_count: policy::page_count(total, page_size) as u32,
        total: total as u64,
    }
}

// --- Auth Handlers ---

/// register_user
///
/// [Public Route] Creates an account and signs the first token. The password
/// is hashed with Argon2 before storage; a taken username or email returns 409.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = AuthResponse),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let password_hash =
        auth::hash_password(&payload.password).ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_user = User {
        id: Uuid::new_v4(),
        username: payload.username,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        password_hash,
    };

    let user = state
        .repo
        .create_user(new_user)
        .await
        .ok_or(StatusCode::CONFLICT)?;

    let access_token = auth::issue_token(user.id, &state.config.jwt_secret)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AuthResponse { access_token, user }))
}

/// login
///
/// [Public Route] Verifies credentials and issues a JWT. Unknown usernames and
/// wrong passwords are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let access_token = auth::issue_token(user.id, &state.config.jwt_secret)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AuthResponse { access_token, user }))
}

// --- Feed Handlers ---

/// get_home_feed
///
/// [Public Route] The paginated home feed. Candidates come back from the
/// repository ordered (pub_date DESC, id DESC); the policy filters them for
/// this viewer, so authors see their own hidden and scheduled posts inline.
#[utoipa::path(
    get,
    path = "/posts",
    params(FeedQuery),
    responses((status = 200, description = "Home feed page", body = FeedPage))
)]
pub async fn get_home_feed(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Json<FeedPage> {
    let candidates = state.repo.get_feed_posts().await;
    let visible = policy::filter_feed(candidates, &viewer, None, Utc::now());
    Json(build_feed_page(visible, query.page))
}

/// get_category_feed
///
/// [Public Route] Posts of one published category. An unknown or unpublished
/// category slug is a 404; within a published category the per-post policy
/// applies as usual.
#[utoipa::path(
    get,
    path = "/categories/{slug}/posts",
    params(("slug" = String, Path, description = "Category slug"), FeedQuery),
    responses(
        (status = 200, description = "Category feed page", body = CategoryFeed),
        (status = 404, description = "No such published category")
    )
)]
pub async fn get_category_feed(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<CategoryFeed>, StatusCode> {
    let category = state
        .repo
        .get_published_category(&slug)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let candidates = state.repo.get_category_posts(category.id).await;
    let visible = policy::filter_feed(candidates, &viewer, None, Utc::now());

    Ok(Json(CategoryFeed {
        category,
        feed: build_feed_page(visible, query.page),
    }))
}

/// get_profile
///
/// [Public Route] A user's public profile by username.
#[utoipa::path(
    get,
    path = "/profiles/{username}",
    params(("username" = String, Path, description = "Profile username")),
    responses(
        (status = 200, description = "Profile", body = User),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, StatusCode> {
    match state.repo.get_user_by_username(&username).await {
        Some(user) => Ok(Json(user)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_profile_feed
///
/// [Public Route] The paginated feed of one author's posts. When the profile
/// owner views their own profile the feed is unfiltered: all of their posts,
/// including unpublished, scheduled and unpublished-category ones. Everyone
/// else gets the general-audience view.
#[utoipa::path(
    get,
    path = "/profiles/{username}/posts",
    params(("username" = String, Path, description = "Profile username"), FeedQuery),
    responses(
        (status = 200, description = "Profile feed page", body = FeedPage),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_profile_feed(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedPage>, StatusCode> {
    let profile = state
        .repo
        .get_user_by_username(&username)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let candidates = state.repo.get_author_posts(profile.id).await;
    let visible = policy::filter_feed(candidates, &viewer, Some(profile.id), Utc::now());

    Ok(Json(build_feed_page(visible, query.page)))
}

// --- Post Handlers ---

/// get_post_detail
///
/// [Public Route] One post by id. A post the viewer may not see answers 404,
/// exactly like a missing one, so hidden and scheduled posts cannot be probed.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn get_post_detail(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, StatusCode> {
    let post = state.repo.get_post(id).await.ok_or(StatusCode::NOT_FOUND)?;

    if !policy::can_view_detail(&post, &viewer, Utc::now()) {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(post))
}

/// get_post_comments
///
/// [Public Route] Comments of one post, oldest first. Gated on the same
/// visibility rule as the post detail itself.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn get_post_comments(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, StatusCode> {
    let post = state.repo.get_post(id).await.ok_or(StatusCode::NOT_FOUND)?;

    if !policy::can_view_detail(&post, &viewer, Utc::now()) {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(state.repo.get_comments(id).await))
}

/// create_post
///
/// [Authenticated Route] Submits a new post. The author is the session user,
/// fixed at creation; a future `pub_date` schedules the post.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses((status = 200, description = "Created", body = Post))
)]
pub async fn create_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<Post>, StatusCode> {
    match state.repo.create_post(payload, user_id).await {
        Some(post) => Ok(Json(post)),
        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// update_post
///
/// [Authenticated Route] Edits a post. Ordering of the checks matters: a post
/// the caller cannot even see answers 404 (no existence leak); a visible post
/// the caller does not own answers 403.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn update_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, StatusCode> {
    let viewer = Viewer::User(user_id);
    let post = state.repo.get_post(id).await.ok_or(StatusCode::NOT_FOUND)?;

    if !policy::can_view_detail(&post, &viewer, Utc::now()) {
        return Err(StatusCode::NOT_FOUND);
    }
    if !policy::can_mutate(&post, &viewer) {
        return Err(StatusCode::FORBIDDEN);
    }

    match state.repo.update_post(id, user_id, payload).await {
        Some(post) => Ok(Json(post)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// delete_post
///
/// [Authenticated Route] Deletes the caller's own post; its comments cascade.
/// Same 404-before-403 ordering as `update_post`.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn delete_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    let viewer = Viewer::User(user_id);
    let Some(post) = state.repo.get_post(id).await else {
        return StatusCode::NOT_FOUND;
    };

    if !policy::can_view_detail(&post, &viewer, Utc::now()) {
        return StatusCode::NOT_FOUND;
    }
    if !policy::can_mutate(&post, &viewer) {
        return StatusCode::FORBIDDEN;
    }

    if state.repo.delete_post(id, user_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Comment Handlers ---

/// add_comment
///
/// [Authenticated Route] Comments on a post the caller can see; commenting on
/// a hidden or scheduled post answers 404 like any other access to it.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment added", body = Comment),
        (status = 404, description = "Not found or not visible")
    )
)]
pub async fn add_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, StatusCode> {
    let viewer = Viewer::User(user_id);
    let post = state
        .repo
        .get_post(post_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    if !policy::can_view_detail(&post, &viewer, Utc::now()) {
        return Err(StatusCode::NOT_FOUND);
    }

    match state.repo.add_comment(post_id, user_id, payload.text).await {
        Some(comment) => Ok(Json(comment)),
        None => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// update_comment
///
/// [Authenticated Route] Edits a comment; only its author may. 403 for anyone
/// else, 404 when the comment does not exist.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, StatusCode> {
    let viewer = Viewer::User(user_id);
    let comment = state
        .repo
        .get_comment(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    if !policy::can_mutate_comment(&comment, &viewer) {
        return Err(StatusCode::FORBIDDEN);
    }

    match state.repo.update_comment(id, user_id, payload.text).await {
        Some(comment) => Ok(Json(comment)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment; only its author may.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> StatusCode {
    let viewer = Viewer::User(user_id);
    let Some(comment) = state.repo.get_comment(id).await else {
        return StatusCode::NOT_FOUND;
    };

    if !policy::can_mutate_comment(&comment, &viewer) {
        return StatusCode::FORBIDDEN;
    }

    if state.repo.delete_comment(id, user_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Profile Handlers ---

/// get_me
///
/// [Authenticated Route] The authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, StatusCode> {
    match state.repo.get_user(id).await {
        Some(user) => Ok(Json(user)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_my_posts
///
/// [Authenticated Route] All of the caller's posts, unfiltered: drafts,
/// scheduled posts and posts in unpublished categories included.
#[utoipa::path(
    get,
    path = "/me/posts",
    responses((status = 200, description = "My posts", body = [Post]))
)]
pub async fn get_my_posts(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<models::Post>> {
    let posts = state.repo.get_author_posts(id).await;
    Json(posts)
}

/// update_profile
///
/// [Authenticated Route] Edits the caller's own profile. The target identity
/// comes from the session, so editing someone else's profile is not
/// expressible on this route.
#[utoipa::path(
    put,
    path = "/me/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated", body = User))
)]
pub async fn update_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, StatusCode> {
    match state.repo.update_user(id, payload).await {
        Some(user) => Ok(Json(user)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

// --- Upload Handler ---

/// get_presigned_upload_url
///
/// [Authenticated Route] Generates a temporary URL for uploading a post image
/// directly to object storage. Keys live under `posts/` with a fresh UUID;
/// only image MIME types are signed.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 415, description = "Not an image type")
    )
)]
pub async fn get_presigned_upload_url(
    AuthUser { id: _user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> impl IntoResponse {
    if !payload.file_type.starts_with("image/") {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let object_key = format!("posts/{}.{}", Uuid::new_v4(), extension);

    match state
        .storage
        .presign_image_upload(&object_key, &payload.file_type)
        .await
    {
        Ok(url) => {
            let response = PresignedUrlResponse {
                upload_url: url,
                resource_key: object_key,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("presign failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
