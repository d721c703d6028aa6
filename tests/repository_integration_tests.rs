//! Repository tests against a live Postgres instance.
//!
//! These run against the database named by DATABASE_URL and are ignored by
//! default; run them with `cargo test -- --ignored` once the Dockerized
//! database is up. `serial_test` keeps them from interleaving writes.

use blogicum::models::{CreatePostRequest, User};
use blogicum::repository::{PostgresRepository, Repository};
use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn connect() -> PostgresRepository {
    dotenv::dotenv().ok();
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for these tests");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");
    PostgresRepository::new(pool)
}

async fn seed_user(repo: &PostgresRepository) -> User {
    let suffix = Uuid::new_v4().simple().to_string();
    let user = User {
        id: Uuid::new_v4(),
        username: format!("tester_{suffix}"),
        email: format!("tester_{suffix}@example.com"),
        first_name: None,
        last_name: None,
        password_hash: "x".to_string(),
    };
    repo.create_user(user).await.expect("seed user")
}

fn post_request(title: &str, offset_days: i64) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        text: "body".to_string(),
        pub_date: Utc::now() + Duration::days(offset_days),
        is_published: true,
        ..CreatePostRequest::default()
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a live Postgres database"]
async fn author_posts_come_back_newest_first() {
    let repo = connect().await;
    let author = seed_user(&repo).await;

    let older = repo
        .create_post(post_request("older", -2), author.id)
        .await
        .expect("create older");
    let newer = repo
        .create_post(post_request("newer", -1), author.id)
        .await
        .expect("create newer");

    let posts = repo.get_author_posts(author.id).await;
    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let older_pos = ids.iter().position(|id| *id == older.id).unwrap();
    let newer_pos = ids.iter().position(|id| *id == newer.id).unwrap();
    assert!(newer_pos < older_pos);

    repo.delete_post(older.id, author.id).await;
    repo.delete_post(newer.id, author.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a live Postgres database"]
async fn delete_post_is_owner_scoped() {
    let repo = connect().await;
    let author = seed_user(&repo).await;
    let stranger = seed_user(&repo).await;

    let post = repo
        .create_post(post_request("mine", 0), author.id)
        .await
        .expect("create post");

    assert!(!repo.delete_post(post.id, stranger.id).await);
    assert!(repo.get_post(post.id).await.is_some());

    assert!(repo.delete_post(post.id, author.id).await);
    assert!(repo.get_post(post.id).await.is_none());
}

#[tokio::test]
#[serial]
#[ignore = "requires a live Postgres database"]
async fn deleting_a_post_cascades_to_its_comments() {
    let repo = connect().await;
    let author = seed_user(&repo).await;

    let post = repo
        .create_post(post_request("commented", 0), author.id)
        .await
        .expect("create post");
    let comment = repo
        .add_comment(post.id, author.id, "first!".to_string())
        .await
        .expect("add comment");

    assert!(repo.delete_post(post.id, author.id).await);
    assert!(repo.get_comment(comment.id).await.is_none());
}
