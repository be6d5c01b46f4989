//! # In-memory store
//!
//! Process-local implementation of the store ports, used for development and
//! end-to-end tests. Mirrors the constraints of the relational schema:
//! foreign keys on threads/posts, unique username/email, and cascading thread
//! deletion.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::{
    ActivityLog, ActivityLogEntry, AuthorName, Category, CategoryId, CategoryName, NewPost, NewThread,
    NewUser, Post, PostId, StoreError, Thread, ThreadId, ThreadRepository, ThreadSummary, User,
    UserId, UserRepository,
};

#[derive(Default)]
pub struct InMemoryForumStore {
    users: DashMap<UserId, User>,
    categories: DashMap<CategoryId, Category>,
    threads: DashMap<ThreadId, Thread>,
    posts: DashMap<PostId, Post>,
    next_id: AtomicI64,
    // Serialises user inserts so the uniqueness check and the insert are atomic.
    user_writes: Mutex<()>,
}

impl InMemoryForumStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Inserts a category and returns it. Names are not deduplicated.
    pub fn add_category(&self, name: &str) -> Category {
        let category = Category {
            id: self.next_id(),
            name: name.to_string(),
        };
        self.categories.insert(category.id, category.clone());
        category
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn posts_for(&self, thread_id: ThreadId) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.thread_id == thread_id)
            .map(|p| p.value().clone())
            .collect();
        posts.sort_by_key(|p| p.id);
        posts
    }
}

#[async_trait]
impl ThreadRepository for InMemoryForumStore {
    async fn insert_thread(&self, thread: NewThread) -> Result<Thread, StoreError> {
        if !self.users.contains_key(&thread.user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "threads_user_id_fkey: user does not exist".into(),
            ));
        }
        if !self.categories.contains_key(&thread.category_id) {
            return Err(StoreError::ForeignKeyViolation(
                "threads_category_id_fkey: category does not exist".into(),
            ));
        }

        let row = Thread {
            id: self.next_id(),
            title: thread.title,
            user_id: thread.user_id,
            category_id: thread.category_id,
            created_at: Utc::now(),
        };
        self.threads.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        if !self.threads.contains_key(&post.thread_id) {
            return Err(StoreError::ForeignKeyViolation(
                "posts_thread_id_fkey: thread does not exist".into(),
            ));
        }
        if !self.users.contains_key(&post.user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "posts_user_id_fkey: user does not exist".into(),
            ));
        }

        let row = Post {
            id: self.next_id(),
            thread_id: post.thread_id,
            user_id: post.user_id,
            content: post.content,
            is_original_post: post.is_original_post,
            created_at: Utc::now(),
        };
        self.posts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_thread(&self, id: ThreadId) -> Result<(), StoreError> {
        if self.threads.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("thread {id}")));
        }
        self.posts.retain(|_, p| p.thread_id != id);
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, StoreError> {
        // Threads without an original post are in flight or orphaned.
        let opened: HashSet<ThreadId> = self
            .posts
            .iter()
            .filter(|p| p.is_original_post)
            .map(|p| p.thread_id)
            .collect();
        let mut rows: Vec<ThreadSummary> = self
            .threads
            .iter()
            .filter(|t| opened.contains(&t.id))
            .map(|t| ThreadSummary {
                id: t.id,
                title: t.title.clone(),
                created_at: t.created_at,
                categories: self
                    .categories
                    .get(&t.category_id)
                    .map(|c| CategoryName { name: c.name.clone() }),
                users: self
                    .users
                    .get(&t.user_id)
                    .map(|u| AuthorName { username: u.username.clone() }),
            })
            .collect();
        // Ids are monotonic, so they break ties between equal timestamps.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

#[async_trait]
impl UserRepository for InMemoryForumStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let _guard = self
            .user_writes
            .lock()
            .map_err(|_| StoreError::Other("user table lock poisoned".into()))?;

        if self.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation("users_username_key".into()));
        }
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }

        let row = User {
            id: self.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        self.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone()))
    }
}

/// Activity sink that keeps entries in memory. Readiness and write failures
/// can be toggled to simulate an unreachable document store.
pub struct InMemoryActivityLog {
    entries: Mutex<Vec<ActivityLogEntry>>,
    ready: AtomicBool,
    failing: AtomicBool,
}

impl Default for InMemoryActivityLog {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        }
    }
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("activity store unreachable".into()));
        }
        self.entries
            .lock()
            .map_err(|_| StoreError::Other("activity log lock poisoned".into()))?
            .push(entry.clone());
        Ok(())
    }
}
