use crate::models::{
    Category, Comment, CreatePostRequest, Post, UpdatePostRequest, UpdateProfileRequest, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations, letting handlers talk
/// to the data layer without knowing the implementation (Postgres, mock).
///
/// Post queries return already-materialized, already-ordered rows scoped only
/// by their anchor (everything / one category / one author). Visibility is
/// *not* decided here: the policy module filters the materialized rows, so
/// there is exactly one place where the published/time/category rule lives.
/// Owner-scoped UPDATE/DELETE conditions remain as a second line of defense
/// behind the policy checks in the handlers.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Post Retrieval (candidates, ordered by pub_date DESC, id DESC) ---
    async fn get_feed_posts(&self) -> Vec<Post>;
    async fn get_category_posts(&self, category_id: Uuid) -> Vec<Post>;
    async fn get_author_posts(&self, author_id: Uuid) -> Vec<Post>;
    // Single-post fetch with category flag, location name and comment count.
    async fn get_post(&self, id: Uuid) -> Option<Post>;

    // --- Post Mutation ---
    // The author is fixed at creation time and immutable afterwards.
    async fn create_post(&self, req: CreatePostRequest, author_id: Uuid) -> Option<Post>;
    // Owner-scoped: updates only when `author_id` matches the row.
    async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        req: UpdatePostRequest,
    ) -> Option<Post>;
    // Owner-scoped: deleting a post cascades to its comments (FK).
    async fn delete_post(&self, id: Uuid, author_id: Uuid) -> bool;

    // --- Categories ---
    // Only published categories resolve; unpublished ones read as absent.
    async fn get_published_category(&self, slug: &str) -> Option<Category>;

    // --- Comments ---
    async fn get_comments(&self, post_id: Uuid) -> Vec<Comment>;
    async fn get_comment(&self, id: i64) -> Option<Comment>;
    async fn add_comment(&self, post_id: Uuid, author_id: Uuid, text: String) -> Option<Comment>;
    // Author-scoped edit and delete.
    async fn update_comment(&self, id: i64, author_id: Uuid, text: String) -> Option<Comment>;
    async fn delete_comment(&self, id: i64, author_id: Uuid) -> bool;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    // Returns None when the username or email is already taken.
    async fn create_user(&self, user: User) -> Option<User>;
    async fn update_user(&self, id: Uuid, req: UpdateProfileRequest) -> Option<User>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the app state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Shared projection for all post reads. The LEFT JOINs materialize the
// category publish flag, the location name and the derived comment count so
// the policy can run over plain values.
const POST_SELECT: &str = r#"
    SELECT p.id, p.author_id, p.title, p.text, p.pub_date, p.is_published,
           p.category_id, p.location_id, p.image, p.created_at,
           c.is_published AS category_is_published,
           l.name AS location_name,
           COALESCE(cc.comment_count, 0) AS comment_count
    FROM posts p
    LEFT JOIN categories c ON p.category_id = c.id
    LEFT JOIN locations l ON p.location_id = l.id
    LEFT JOIN (
        SELECT post_id, COUNT(*) AS comment_count FROM comments GROUP BY post_id
    ) cc ON cc.post_id = p.id
"#;

// Defined feed sort key: newest publication instant first, identifier as the
// deterministic tie-breaker.
const POST_ORDER: &str = " ORDER BY p.pub_date DESC, p.id DESC";

const COMMENT_SELECT: &str = r#"
    SELECT cm.id, cm.post_id, cm.author_id, cm.text, cm.created_at,
           u.username AS author_username
    FROM comments cm
    JOIN users u ON cm.author_id = u.id
"#;

const USER_SELECT: &str =
    "SELECT id, username, email, first_name, last_name, password_hash FROM users";

#[async_trait]
impl Repository for PostgresRepository {
    /// get_feed_posts
    ///
    /// All candidate posts for the home feed. No visibility conditions here;
    /// the policy filters per viewer.
    async fn get_feed_posts(&self) -> Vec<Post> {
        let sql = format!("{POST_SELECT}{POST_ORDER}");
        match sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("get_feed_posts error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_category_posts
    ///
    /// Candidate posts anchored to one category.
    async fn get_category_posts(&self, category_id: Uuid) -> Vec<Post> {
        let sql = format!("{POST_SELECT} WHERE p.category_id = $1{POST_ORDER}");
        match sqlx::query_as::<_, Post>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("get_category_posts error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_author_posts
    ///
    /// Candidate posts anchored to one author; backs the profile feed and the
    /// owner's own post list.
    async fn get_author_posts(&self, author_id: Uuid) -> Vec<Post> {
        let sql = format!("{POST_SELECT} WHERE p.author_id = $1{POST_ORDER}");
        match sqlx::query_as::<_, Post>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("get_author_posts error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_post
    ///
    /// Raw fetch by ID with no visibility condition. The handler decides what
    /// the requesting viewer may do with the row.
    async fn get_post(&self, id: Uuid) -> Option<Post> {
        let sql = format!("{POST_SELECT} WHERE p.id = $1");
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_post error: {:?}", e);
                None
            })
    }

    /// create_post
    ///
    /// Inserts a new post with the session's user as the immutable author,
    /// then re-reads it through the joined projection.
    async fn create_post(&self, req: CreatePostRequest, author_id: Uuid) -> Option<Post> {
        let new_id = Uuid::new_v4();
        let inserted = sqlx::query(
            r#"INSERT INTO posts
               (id, author_id, title, text, pub_date, is_published,
                category_id, location_id, image, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())"#,
        )
        .bind(new_id)
        .bind(author_id)
        .bind(&req.title)
        .bind(&req.text)
        .bind(req.pub_date)
        .bind(req.is_published)
        .bind(req.category_id)
        .bind(req.location_id)
        .bind(&req.image_key)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => self.get_post(new_id).await,
            Err(e) => {
                tracing::error!("create_post error: {:?}", e);
                None
            }
        }
    }

    /// update_post
    ///
    /// Updates a post only if `author_id` matches the owner. COALESCE leaves
    /// columns untouched when the corresponding field is `None`.
    async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        req: UpdatePostRequest,
    ) -> Option<Post> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE posts
            SET title = COALESCE($3, title),
                text = COALESCE($4, text),
                pub_date = COALESCE($5, pub_date),
                is_published = COALESCE($6, is_published),
                category_id = COALESCE($7, category_id),
                location_id = COALESCE($8, location_id),
                image = COALESCE($9, image)
            WHERE id = $1 AND author_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(author_id)
        .bind(&req.title)
        .bind(&req.text)
        .bind(req.pub_date)
        .bind(req.is_published)
        .bind(req.category_id)
        .bind(req.location_id)
        .bind(&req.image_key)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_post error: {:?}", e);
            None
        })?;

        self.get_post(updated).await
    }

    /// delete_post
    ///
    /// Deletes a post only if `author_id` matches the owner. The FK on
    /// `comments.post_id` carries `ON DELETE CASCADE`, so the post's comments
    /// go with it. Category and location references on other posts are
    /// unaffected (those FKs use `ON DELETE SET NULL` in the other direction).
    async fn delete_post(&self, id: Uuid, author_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_post error: {:?}", e);
                false
            }
        }
    }

    /// get_published_category
    ///
    /// Resolves a category by slug, but only when it is published. An
    /// unpublished category reads as absent so its feed 404s without leaking
    /// that the slug exists.
    async fn get_published_category(&self, slug: &str) -> Option<Category> {
        sqlx::query_as::<_, Category>(
            r#"SELECT id, title, description, slug, is_published, created_at
               FROM categories WHERE slug = $1 AND is_published = true"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_published_category error: {:?}", e);
            None
        })
    }

    /// get_comments
    ///
    /// All comments on a post, oldest first, with the author's username
    /// joined in. Whether the post itself may be shown is the handler's call.
    async fn get_comments(&self, post_id: Uuid) -> Vec<Comment> {
        let sql = format!("{COMMENT_SELECT} WHERE cm.post_id = $1 ORDER BY cm.created_at ASC");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_comments error: {:?}", e);
                vec![]
            })
    }

    /// get_comment
    ///
    /// Raw fetch of a single comment for the edit/delete authorization check.
    async fn get_comment(&self, id: i64) -> Option<Comment> {
        let sql = format!("{COMMENT_SELECT} WHERE cm.id = $1");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_comment error: {:?}", e);
                None
            })
    }

    /// add_comment
    ///
    /// Inserts a comment and joins the author's username back in one query
    /// via a CTE.
    async fn add_comment(&self, post_id: Uuid, author_id: Uuid, text: String) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, author_id, text, created_at
            )
            SELECT i.id, i.post_id, i.author_id, i.text, i.created_at,
                   u.username AS author_username
            FROM inserted i JOIN users u ON i.author_id = u.id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("add_comment error: {:?}", e);
            None
        })
    }

    /// update_comment
    ///
    /// Edits a comment only if `author_id` matches its author.
    async fn update_comment(&self, id: i64, author_id: Uuid, text: String) -> Option<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET text = $3
                WHERE id = $1 AND author_id = $2
                RETURNING id, post_id, author_id, text, created_at
            )
            SELECT up.id, up.post_id, up.author_id, up.text, up.created_at,
                   u.username AS author_username
            FROM updated up JOIN users u ON up.author_id = u.id
            "#,
        )
        .bind(id)
        .bind(author_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_comment error: {:?}", e);
            None
        })
    }

    /// delete_comment
    ///
    /// Deletes a comment only if `author_id` matches its author.
    async fn delete_comment(&self, id: i64, author_id: Uuid) -> bool {
        match sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_comment error: {:?}", e);
                false
            }
        }
    }

    /// get_user
    ///
    /// Identity lookup by primary key, used by the auth extractor on every
    /// authenticated request.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        let sql = format!("{USER_SELECT} WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// get_user_by_username
    ///
    /// Profile lookup by the username slug; also backs the login credential
    /// check.
    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let sql = format!("{USER_SELECT} WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_by_username error: {:?}", e);
                None
            })
    }

    /// create_user
    ///
    /// Registers a new user. `ON CONFLICT DO NOTHING` turns a taken username
    /// or email into a `None`, which the handler maps to 409.
    async fn create_user(&self, user: User) -> Option<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, email, first_name, last_name, password_hash)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT DO NOTHING
               RETURNING id, username, email, first_name, last_name, password_hash"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    /// update_user
    ///
    /// Partial profile update for the user themselves; COALESCE keeps the
    /// untouched columns.
    async fn update_user(&self, id: Uuid, req: UpdateProfileRequest) -> Option<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name)
            WHERE id = $1
            RETURNING id, username, email, first_name, last_name, password_hash
            "#,
        )
        .bind(id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_user error: {:?}", e);
            None
        })
    }
}
