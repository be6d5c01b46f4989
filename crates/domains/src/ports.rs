//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Store ports are async and object safe; they are shared as `Arc<dyn Port>`.

use async_trait::async_trait;

use crate::error::{AuthError, StoreError};
use crate::models::{
    ActivityLogEntry, NewPost, NewThread, NewUser, Post, Thread, ThreadId, ThreadSummary, User,
};

/// Relational persistence for threads and posts.
///
/// Each method is a single, independently committed write or read. Callers
/// needing multi-row atomicity must compensate themselves.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn insert_thread(&self, thread: NewThread) -> Result<Thread, StoreError>;
    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError>;
    /// Removes a thread and anything that references it.
    async fn delete_thread(&self, id: ThreadId) -> Result<(), StoreError>;
    /// All threads, newest first, with category and author names expanded.
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, StoreError>;
}

/// Relational persistence for accounts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `StoreError::UniqueViolation` on a taken username or email.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Append-only document sink for the activity trail.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Observable connection readiness. Writes are skipped while `false`.
    fn is_ready(&self) -> bool;
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), StoreError>;
}

/// Salted password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    /// `false` on mismatch or on an unparseable stored hash.
    fn verify_password(&self, password: &str, stored_hash: &str) -> bool;
}

/// Issues bearer tokens for authenticated users.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<String, AuthError>;
}
