//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! Identifiers are assigned by the relational store on insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = i64;
pub type CategoryId = i64;
pub type ThreadId = i64;
pub type PostId = i64;

/// Acting user id recorded for anonymous requests.
pub const GUEST_USER_ID: UserId = 0;

/// Longest title the `threads.title` column accepts.
pub const MAX_TITLE_CHARS: usize = 255;

/// Column widths of `users.username` and `users.email`.
pub const MAX_USERNAME_CHARS: usize = 64;
pub const MAX_EMAIL_CHARS: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string; never serialised to clients.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A discussion topic. Only visible while its original post exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub content: String,
    /// Exactly one post per thread carries this flag.
    pub is_original_post: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub title: String,
    pub user_id: UserId,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub content: String,
    pub is_original_post: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorName {
    pub username: String,
}

/// Row of the thread listing, with category and author expanded as nested
/// objects (`categories: {name}`, `users: {username}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: ThreadId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub categories: Option<CategoryName>,
    pub users: Option<AuthorName>,
}

/// Tag of an observational activity entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActivityAction {
    #[serde(rename = "GET_THREADS_REQUEST")]
    RequestReceived,
    #[serde(rename = "CREATE_THREAD_SUCCESS")]
    ThreadCreated,
    #[serde(rename = "REGISTER_USER_SUCCESS")]
    UserRegistered,
    #[serde(rename = "LOGIN_SUCCESS")]
    LoginSucceeded,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::RequestReceived => "GET_THREADS_REQUEST",
            ActivityAction::ThreadCreated => "CREATE_THREAD_SUCCESS",
            ActivityAction::UserRegistered => "REGISTER_USER_SUCCESS",
            ActivityAction::LoginSucceeded => "LOGIN_SUCCESS",
        }
    }
}

/// A single document in the activity trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// `GUEST_USER_ID` for anonymous actors.
    pub user_id: UserId,
    pub action: ActivityAction,
    pub details: serde_json::Value,
}

impl ActivityLogEntry {
    pub fn new(user_id: UserId, action: ActivityAction, details: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id,
            action,
            details,
        }
    }
}
