//! # PostgreSQL store
//!
//! This module implements the data mapping between the relational model and
//! the `domains` models.
//!
//! Every port method is a single auto-committed statement. Multi-row
//! consistency (thread + original post) is the caller's business.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    AuthorName, Category, CategoryName, NewPost, NewThread, NewUser, Post, StoreError, Thread,
    ThreadId, ThreadRepository, ThreadSummary, User, UserRepository,
};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

pub struct PgForumStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct ThreadRow {
    id: i64,
    title: String,
    user_id: i64,
    category_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PostRow {
    id: i64,
    thread_id: i64,
    user_id: i64,
    content: String,
    is_original_post: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SummaryRow {
    id: i64,
    title: String,
    created_at: DateTime<Utc>,
    category_name: Option<String>,
    author_username: Option<String>,
}

impl From<ThreadRow> for Thread {
    fn from(row: ThreadRow) -> Self {
        Thread {
            id: row.id,
            title: row.title,
            user_id: row.user_id,
            category_id: row.category_id,
            created_at: row.created_at,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            thread_id: row.thread_id,
            user_id: row.user_id,
            content: row.content,
            is_original_post: row.is_original_post,
            created_at: row.created_at,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

impl From<SummaryRow> for ThreadSummary {
    fn from(row: SummaryRow) -> Self {
        ThreadSummary {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            categories: row.category_name.map(|name| CategoryName { name }),
            users: row.author_username.map(|username| AuthorName { username }),
        }
    }
}

/// Translates driver errors into the store taxonomy, keeping the database
/// message for diagnosis.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let detail = match db.constraint() {
                Some(constraint) => format!("{} ({constraint})", db.message()),
                None => db.message().to_string(),
            };
            if db.is_unique_violation() {
                StoreError::UniqueViolation(detail)
            } else if db.is_foreign_key_violation() {
                StoreError::ForeignKeyViolation(detail)
            } else {
                StoreError::Other(detail)
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound("row".into()),
        sqlx::Error::PoolTimedOut => StoreError::Unavailable("connection pool timed out".into()),
        sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".into()),
        sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
        other => StoreError::Other(other.to_string()),
    }
}

fn connect_options(
    url: &str,
    statement_timeout: Option<Duration>,
) -> Result<PgConnectOptions, StoreError> {
    let options: PgConnectOptions = url.parse().map_err(map_sqlx_error)?;
    Ok(match statement_timeout {
        Some(limit) => {
            options.options([("statement_timeout", limit.as_millis().to_string())])
        }
        None => options,
    })
}

impl PgForumStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a lazily-connecting pool; the first query establishes connections.
    ///
    /// With a `statement_timeout`, the server cancels and rolls back any
    /// statement running longer, so a timed-out insert never commits.
    pub fn connect_lazy(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        statement_timeout: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let options = connect_options(url, statement_timeout)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Other(format!("migration failed: {e}")))?;
        info!("database schema up to date");
        Ok(())
    }

    /// Inserts a category unless one with the same name exists.
    pub async fn ensure_category(&self, name: &str) -> Result<Category, StoreError> {
        let (id, name): (i64, String) = sqlx::query_as(
            "INSERT INTO categories (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(Category { id, name })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ThreadRepository for PgForumStore {
    async fn insert_thread(&self, thread: NewThread) -> Result<Thread, StoreError> {
        let row: ThreadRow = sqlx::query_as(
            "INSERT INTO threads (title, user_id, category_id) VALUES ($1, $2, $3)
             RETURNING id, title, user_id, category_id, created_at",
        )
        .bind(&thread.title)
        .bind(thread.user_id)
        .bind(thread.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        debug!(thread_id = row.id, "thread row inserted");
        Ok(row.into())
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let row: PostRow = sqlx::query_as(
            "INSERT INTO posts (thread_id, user_id, content, is_original_post) VALUES ($1, $2, $3, $4)
             RETURNING id, thread_id, user_id, content, is_original_post, created_at",
        )
        .bind(post.thread_id)
        .bind(post.user_id)
        .bind(&post.content)
        .bind(post.is_original_post)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_thread(&self, id: ThreadId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM threads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("thread {id}")));
        }
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, StoreError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT t.id, t.title, t.created_at,
                    c.name AS category_name,
                    u.username AS author_username
             FROM threads t
             LEFT JOIN categories c ON c.id = t.category_id
             LEFT JOIN users u ON u.id = t.user_id
             WHERE EXISTS (
                 SELECT 1 FROM posts p WHERE p.thread_id = t.id AND p.is_original_post
             )
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ThreadSummary::from).collect())
    }
}

#[async_trait]
impl UserRepository for PgForumStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(User::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn statement_timeout_is_sent_to_the_server() {
        let options = connect_options(
            "postgres://forum@localhost/forum",
            Some(Duration::from_millis(1500)),
        )
        .unwrap();
        assert!(options
            .get_options()
            .is_some_and(|o| o.contains("statement_timeout=1500")));

        let unbounded = connect_options("postgres://forum@localhost/forum", None).unwrap();
        assert!(unbounded.get_options().is_none());
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn summary_row_without_relations_has_null_objects() {
        let summary = ThreadSummary::from(SummaryRow {
            id: 1,
            title: "Hello".into(),
            created_at: Utc::now(),
            category_name: None,
            author_username: Some("alice".into()),
        });
        assert!(summary.categories.is_none());
        assert_eq!(summary.users.unwrap().username, "alice");
    }
}
