use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use blogicum::{
    AppState, auth,
    auth::{AuthUser, OptionalAuthUser},
    config::AppConfig,
    handlers::{self, FeedQuery},
    models::{
        Category, Comment, CreateCommentRequest, CreatePostRequest, LoginRequest, Post,
        PresignedUrlRequest, PresignedUrlResponse, RegisterRequest, UpdateCommentRequest,
        UpdatePostRequest, UpdateProfileRequest, User,
    },
    policy::Viewer,
    repository::Repository,
    storage::MockStorageService,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Data-driven mock: seeded rows, trait methods answer from them the way the
// Postgres implementation answers from its tables. Handlers only see the
// trait, so this is the whole persistence layer for these tests.
#[derive(Default)]
pub struct MockRepository {
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub users: Vec<User>,
    pub categories: Vec<Category>,
}

#[async_trait]
impl Repository for MockRepository {
    async fn get_feed_posts(&self) -> Vec<Post> {
        self.posts.clone()
    }

    async fn get_category_posts(&self, category_id: Uuid) -> Vec<Post> {
        self.posts
            .iter()
            .filter(|p| p.category_id == Some(category_id))
            .cloned()
            .collect()
    }

    async fn get_author_posts(&self, author_id: Uuid) -> Vec<Post> {
        self.posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect()
    }

    async fn get_post(&self, id: Uuid) -> Option<Post> {
        self.posts.iter().find(|p| p.id == id).cloned()
    }

    async fn create_post(&self, req: CreatePostRequest, author_id: Uuid) -> Option<Post> {
        Some(Post {
            id: Uuid::new_v4(),
            author_id,
            title: req.title,
            text: req.text,
            pub_date: req.pub_date,
            is_published: req.is_published,
            category_id: req.category_id,
            location_id: req.location_id,
            image: req.image_key,
            ..Post::default()
        })
    }

    async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        req: UpdatePostRequest,
    ) -> Option<Post> {
        let mut post = self
            .posts
            .iter()
            .find(|p| p.id == id && p.author_id == author_id)
            .cloned()?;
        if let Some(title) = req.title {
            post.title = title;
        }
        if let Some(text) = req.text {
            post.text = text;
        }
        if let Some(pub_date) = req.pub_date {
            post.pub_date = pub_date;
        }
        if let Some(is_published) = req.is_published {
            post.is_published = is_published;
        }
        Some(post)
    }

    async fn delete_post(&self, id: Uuid, author_id: Uuid) -> bool {
        self.posts
            .iter()
            .any(|p| p.id == id && p.author_id == author_id)
    }

    async fn get_published_category(&self, slug: &str) -> Option<Category> {
        self.categories
            .iter()
            .find(|c| c.slug == slug && c.is_published)
            .cloned()
    }

    async fn get_comments(&self, post_id: Uuid) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect()
    }

    async fn get_comment(&self, id: i64) -> Option<Comment> {
        self.comments.iter().find(|c| c.id == id).cloned()
    }

    async fn add_comment(&self, post_id: Uuid, author_id: Uuid, text: String) -> Option<Comment> {
        Some(Comment {
            id: 1,
            post_id,
            author_id,
            text,
            ..Comment::default()
        })
    }

    async fn update_comment(&self, id: i64, author_id: Uuid, text: String) -> Option<Comment> {
        let mut comment = self
            .comments
            .iter()
            .find(|c| c.id == id && c.author_id == author_id)
            .cloned()?;
        comment.text = text;
        Some(comment)
    }

    async fn delete_comment(&self, id: i64, author_id: Uuid) -> bool {
        self.comments
            .iter()
            .any(|c| c.id == id && c.author_id == author_id)
    }

    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.users.iter().find(|u| u.username == username).cloned()
    }

    async fn create_user(&self, user: User) -> Option<User> {
        let taken = self
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken { None } else { Some(user) }
    }

    async fn update_user(&self, id: Uuid, req: UpdateProfileRequest) -> Option<User> {
        let mut user = self.users.iter().find(|u| u.id == id).cloned()?;
        if let Some(username) = req.username {
            user.username = username;
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        Some(user)
    }
}

// --- TEST UTILITIES ---

fn test_state(repo: MockRepository) -> AppState {
    AppState {
        repo: Arc::new(repo),
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

fn auth_user(id: Uuid) -> AuthUser {
    AuthUser {
        id,
        username: "tester".to_string(),
    }
}

fn past() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()
}

fn visible_post(author_id: Uuid) -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id,
        title: "visible".to_string(),
        pub_date: past(),
        is_published: true,
        ..Post::default()
    }
}

fn hidden_post(author_id: Uuid) -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id,
        title: "draft".to_string(),
        pub_date: past(),
        is_published: false,
        ..Post::default()
    }
}

fn first_page() -> Query<FeedQuery> {
    Query(FeedQuery { page: None })
}

// --- FEED TESTS ---

#[test]
async fn home_feed_hides_drafts_and_scheduled_posts_from_anonymous() {
    let author = Uuid::new_v4();
    let mut scheduled = visible_post(author);
    scheduled.pub_date = future();
    let mut hidden_category = visible_post(author);
    hidden_category.category_id = Some(Uuid::new_v4());
    hidden_category.category_is_published = Some(false);

    let state = test_state(MockRepository {
        posts: vec![
            visible_post(author),
            hidden_post(author),
            scheduled,
            hidden_category,
        ],
        ..MockRepository::default()
    });

    let Json(feed) = handlers::get_home_feed(
        OptionalAuthUser(Viewer::Anonymous),
        State(state),
        first_page(),
    )
    .await;

    assert_eq!(feed.total, 1);
    assert_eq!(feed.posts.len(), 1);
    assert_eq!(feed.posts[0].title, "visible");
}

#[test]
async fn home_feed_shows_authors_their_own_hidden_posts() {
    let author = Uuid::new_v4();
    let state = test_state(MockRepository {
        posts: vec![visible_post(author), hidden_post(author)],
        ..MockRepository::default()
    });

    let Json(feed) = handlers::get_home_feed(
        OptionalAuthUser(Viewer::User(author)),
        State(state),
        first_page(),
    )
    .await;

    assert_eq!(feed.total, 2);
}

#[test]
async fn home_feed_paginates_and_clamps() {
    let author = Uuid::new_v4();
    let posts: Vec<Post> = (0..25).map(|_| visible_post(author)).collect();
    let state = test_state(MockRepository {
        posts,
        ..MockRepository::default()
    });

    let Json(feed) = handlers::get_home_feed(
        OptionalAuthUser(Viewer::Anonymous),
        State(state.clone()),
        Query(FeedQuery { page: Some(3) }),
    )
    .await;
    assert_eq!(feed.posts.len(), 5);
    assert_eq!(feed.page, 3);
    assert_eq!(feed.page_count, 3);
    assert_eq!(feed.total, 25);

    // Out-of-range page numbers clamp to the last page instead of failing.
    let Json(clamped) = handlers::get_home_feed(
        OptionalAuthUser(Viewer::Anonymous),
        State(state),
        Query(FeedQuery { page: Some(99) }),
    )
    .await;
    assert_eq!(clamped.page, 3);
    assert_eq!(clamped.posts.len(), 5);
}

#[test]
async fn category_feed_404s_on_unpublished_category() {
    let category = Category {
        id: Uuid::new_v4(),
        slug: "travel".to_string(),
        is_published: false,
        ..Category::default()
    };
    let state = test_state(MockRepository {
        categories: vec![category],
        ..MockRepository::default()
    });

    let result = handlers::get_category_feed(
        OptionalAuthUser(Viewer::Anonymous),
        State(state),
        Path("travel".to_string()),
        first_page(),
    )
    .await;

    assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
}

#[test]
async fn category_feed_filters_posts_within_published_category() {
    let author = Uuid::new_v4();
    let category = Category {
        id: Uuid::new_v4(),
        slug: "travel".to_string(),
        is_published: true,
        ..Category::default()
    };
    let mut in_category = visible_post(author);
    in_category.category_id = Some(category.id);
    in_category.category_is_published = Some(true);
    let mut draft_in_category = hidden_post(author);
    draft_in_category.category_id = Some(category.id);
    draft_in_category.category_is_published = Some(true);

    let state = test_state(MockRepository {
        posts: vec![in_category, draft_in_category, visible_post(author)],
        categories: vec![category],
        ..MockRepository::default()
    });

    let result = handlers::get_category_feed(
        OptionalAuthUser(Viewer::Anonymous),
        State(state),
        Path("travel".to_string()),
        first_page(),
    )
    .await;

    let Json(feed) = result.unwrap();
    assert_eq!(feed.category.slug, "travel");
    assert_eq!(feed.feed.total, 1);
}

#[test]
async fn profile_feed_unfiltered_for_its_owner_only() {
    let owner = Uuid::new_v4();
    let owner_user = User {
        id: owner,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        ..User::default()
    };
    let state = test_state(MockRepository {
        posts: vec![visible_post(owner), hidden_post(owner)],
        users: vec![owner_user],
        ..MockRepository::default()
    });

    let Json(own) = handlers::get_profile_feed(
        OptionalAuthUser(Viewer::User(owner)),
        State(state.clone()),
        Path("alice".to_string()),
        first_page(),
    )
    .await
    .unwrap();
    assert_eq!(own.total, 2);

    let Json(public_view) = handlers::get_profile_feed(
        OptionalAuthUser(Viewer::Anonymous),
        State(state),
        Path("alice".to_string()),
        first_page(),
    )
    .await
    .unwrap();
    assert_eq!(public_view.total, 1);
}

// --- DETAIL AND MUTATION TESTS ---

#[test]
async fn post_detail_answers_not_found_when_hidden() {
    let author = Uuid::new_v4();
    let draft = hidden_post(author);
    let draft_id = draft.id;
    let state = test_state(MockRepository {
        posts: vec![draft],
        ..MockRepository::default()
    });

    let anonymous = handlers::get_post_detail(
        OptionalAuthUser(Viewer::Anonymous),
        State(state.clone()),
        Path(draft_id),
    )
    .await;
    assert_eq!(anonymous.err(), Some(StatusCode::NOT_FOUND));

    // The author still reaches their own draft.
    let owned = handlers::get_post_detail(
        OptionalAuthUser(Viewer::User(author)),
        State(state),
        Path(draft_id),
    )
    .await;
    assert!(owned.is_ok());
}

#[test]
async fn update_post_forbidden_for_non_owner_of_visible_post() {
    let author = Uuid::new_v4();
    let post = visible_post(author);
    let post_id = post.id;
    let state = test_state(MockRepository {
        posts: vec![post],
        ..MockRepository::default()
    });

    let result = handlers::update_post(
        auth_user(Uuid::new_v4()),
        State(state),
        Path(post_id),
        Json(UpdatePostRequest::default()),
    )
    .await;

    assert_eq!(result.err(), Some(StatusCode::FORBIDDEN));
}

#[test]
async fn update_post_hides_invisible_posts_from_non_owners() {
    // A draft the caller cannot see answers 404, not 403, so its existence
    // does not leak.
    let author = Uuid::new_v4();
    let draft = hidden_post(author);
    let draft_id = draft.id;
    let state = test_state(MockRepository {
        posts: vec![draft],
        ..MockRepository::default()
    });

    let result = handlers::update_post(
        auth_user(Uuid::new_v4()),
        State(state),
        Path(draft_id),
        Json(UpdatePostRequest::default()),
    )
    .await;

    assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
}

#[test]
async fn author_updates_own_draft() {
    let author = Uuid::new_v4();
    let draft = hidden_post(author);
    let draft_id = draft.id;
    let state = test_state(MockRepository {
        posts: vec![draft],
        ..MockRepository::default()
    });

    let result = handlers::update_post(
        auth_user(author),
        State(state),
        Path(draft_id),
        Json(UpdatePostRequest {
            title: Some("renamed".to_string()),
            ..UpdatePostRequest::default()
        }),
    )
    .await;

    let Json(updated) = result.unwrap();
    assert_eq!(updated.title, "renamed");
}

#[test]
async fn delete_post_owner_only() {
    let author = Uuid::new_v4();
    let post = visible_post(author);
    let post_id = post.id;
    let state = test_state(MockRepository {
        posts: vec![post],
        ..MockRepository::default()
    });

    let forbidden =
        handlers::delete_post(auth_user(Uuid::new_v4()), State(state.clone()), Path(post_id))
            .await;
    assert_eq!(forbidden, StatusCode::FORBIDDEN);

    let deleted = handlers::delete_post(auth_user(author), State(state), Path(post_id)).await;
    assert_eq!(deleted, StatusCode::NO_CONTENT);
}

#[test]
async fn commenting_on_invisible_post_answers_not_found() {
    let author = Uuid::new_v4();
    let draft = hidden_post(author);
    let draft_id = draft.id;
    let state = test_state(MockRepository {
        posts: vec![draft],
        ..MockRepository::default()
    });

    let result = handlers::add_comment(
        auth_user(Uuid::new_v4()),
        State(state),
        Path(draft_id),
        Json(CreateCommentRequest {
            text: "hello".to_string(),
        }),
    )
    .await;

    assert_eq!(result.err(), Some(StatusCode::NOT_FOUND));
}

#[test]
async fn comment_mutation_restricted_to_its_author() {
    let commenter = Uuid::new_v4();
    let comment = Comment {
        id: 7,
        post_id: Uuid::new_v4(),
        author_id: commenter,
        text: "original".to_string(),
        ..Comment::default()
    };
    let state = test_state(MockRepository {
        comments: vec![comment],
        ..MockRepository::default()
    });

    let forbidden = handlers::update_comment(
        auth_user(Uuid::new_v4()),
        State(state.clone()),
        Path(7i64),
        Json(UpdateCommentRequest {
            text: "hijacked".to_string(),
        }),
    )
    .await;
    assert_eq!(forbidden.err(), Some(StatusCode::FORBIDDEN));

    let deleted =
        handlers::delete_comment(auth_user(commenter), State(state), Path(7i64)).await;
    assert_eq!(deleted, StatusCode::NO_CONTENT);
}

// --- AUTH TESTS ---

#[test]
async fn register_conflicts_on_taken_username() {
    let existing = User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        ..User::default()
    };
    let state = test_state(MockRepository {
        users: vec![existing],
        ..MockRepository::default()
    });

    let result = handlers::register_user(
        State(state),
        Json(RegisterRequest {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
            ..RegisterRequest::default()
        }),
    )
    .await;

    assert_eq!(result.err(), Some(StatusCode::CONFLICT));
}

#[test]
async fn register_returns_token_and_profile() {
    let state = test_state(MockRepository::default());

    let Json(auth_response) = handlers::register_user(
        State(state),
        Json(RegisterRequest {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "correct horse battery staple".to_string(),
            ..RegisterRequest::default()
        }),
    )
    .await
    .unwrap();

    assert!(!auth_response.access_token.is_empty());
    assert_eq!(auth_response.user.username, "bob");
}

#[test]
async fn login_rejects_wrong_password() {
    let user = User {
        id: Uuid::new_v4(),
        username: "carol".to_string(),
        email: "carol@example.com".to_string(),
        password_hash: auth::hash_password("right-password").unwrap(),
        ..User::default()
    };
    let state = test_state(MockRepository {
        users: vec![user],
        ..MockRepository::default()
    });

    let bad = handlers::login(
        State(state.clone()),
        Json(LoginRequest {
            username: "carol".to_string(),
            password: "wrong-password".to_string(),
        }),
    )
    .await;
    assert_eq!(bad.err(), Some(StatusCode::UNAUTHORIZED));

    let good = handlers::login(
        State(state),
        Json(LoginRequest {
            username: "carol".to_string(),
            password: "right-password".to_string(),
        }),
    )
    .await;
    assert!(good.is_ok());
}

// --- UPLOAD TESTS ---

#[test]
async fn presigned_upload_rejects_non_image_types() {
    let state = test_state(MockRepository::default());

    let response = handlers::get_presigned_upload_url(
        auth_user(Uuid::new_v4()),
        State(state),
        Json(PresignedUrlRequest {
            filename: "report.pdf".to_string(),
            file_type: "application/pdf".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[test]
async fn presigned_upload_issues_post_image_keys() {
    let state = test_state(MockRepository::default());

    let response = handlers::get_presigned_upload_url(
        auth_user(Uuid::new_v4()),
        State(state),
        Json(PresignedUrlRequest {
            filename: "cover.jpg".to_string(),
            file_type: "image/jpeg".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: PresignedUrlResponse = serde_json::from_slice(&bytes).unwrap();

    assert!(body.resource_key.starts_with("posts/"));
    assert!(body.resource_key.ends_with(".jpg"));
    assert!(body.upload_url.contains(&body.resource_key));
}
