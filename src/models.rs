use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record stored in the `public.users` table.
/// The password hash stays internal: it is loaded for credential checks but
/// never serialized into an API response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    /// Unique login name, also used as the profile URL slug.
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
}

/// Post
///
/// A blog post row from `public.posts`, enriched with everything the
///// visibility policy needs to decide access without further lookups:
/// the owning category's publish flag (LEFT JOIN), the location name,
/// and the derived comment count.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    // FK to public.users.id (Owner). Fixed at creation, immutable afterwards.
    pub author_id: Uuid,
    pub title: String,
    pub text: String,

    /// Scheduled publication instant. May be in the future for deferred posts.
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,

    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    // S3 key of the optional cover image.
    pub image: Option<String>,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    /// Publish flag of the referenced category; `None` when the post has no
    /// category. Materialized by a LEFT JOIN so the policy layer never has to
    /// reach back into the store.
    pub category_is_published: Option<bool>,
    /// Display name of the referenced location, if any.
    pub location_name: Option<String>,
    /// Derived, not stored: number of comments on this post.
    pub comment_count: i64,
}

/// Category
///
/// A category row from `public.categories`. The slug is unique and doubles as
/// the category feed URL segment. Unpublished categories hide their posts from
/// the general audience and their feed returns 404.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A comment row from `public.comments`, augmented with the author's username
/// (a join operation). Comments are deleted in cascade with their post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    // BigInt (i64) keys for comments due to the high volume potential.
    pub id: i64,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Loaded via a JOIN in the repository query.
    #[sqlx(default)]
    pub author_username: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /auth/register).
/// The password is hashed with Argon2 before it touches the database.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// LoginRequest
///
/// Input payload for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// AuthResponse
///
/// Returned by both registration and login: a signed JWT plus the profile it
/// belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// CreatePostRequest
///
/// Input payload for submitting a new post (POST /posts). The author is taken
/// from the authenticated session, never from the payload. Setting `pub_date`
/// in the future schedules the post for deferred publication.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub text: String,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    /// S3 key resulting from the presigned upload flow.
    pub image_key: Option<String>,
}

fn default_published() -> bool {
    true
}

impl Default for CreatePostRequest {
    fn default() -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            pub_date: DateTime::<Utc>::default(),
            is_published: true,
            category_id: None,
            location_id: None,
            image_key: None,
        }
    }
}

/// UpdatePostRequest
///
/// Partial update payload for PUT /posts/{id}. All fields are `Option<T>` and
/// `None` fields are left untouched (COALESCE in the repository).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub pub_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub text: String,
}

/// UpdateCommentRequest
///
/// Input payload for editing an existing comment (author-only).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub text: String,
}

/// UpdateProfileRequest
///
/// Partial update payload for the authenticated user's own profile
/// (PUT /me/profile).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived S3 upload URL for a post image
/// (POST /upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "cover.jpg")]
    pub filename: String,
    /// The MIME type; must be an image type and is baked into the signed URL.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
///
/// Output schema containing the temporary URL for client-to-cloud image upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The S3 object key to reference from the post's `image` field.
    pub resource_key: String,
}

// --- Feed Schemas (Output) ---

/// FeedPage
///
/// One page of an already-filtered, already-ordered feed, plus the pagination
/// metadata the frontend needs to render page controls.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    /// The page actually served, after clamping to the valid range (1-based).
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    /// Total number of posts visible to this viewer, across all pages.
    pub total: u64,
}

/// CategoryFeed
///
/// Output of the category feed endpoint: the (published) category itself plus
/// a page of its visible posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryFeed {
    pub category: Category,
    pub feed: FeedPage,
}
