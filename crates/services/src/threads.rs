//! # Thread Service
//!
//! Listing and creation of discussion threads.
//!
//! Creating a thread is two independent writes against the relational store:
//! the thread row, then its original post. The store offers no transaction
//! across them, so a failed post insert is undone by deleting the thread row
//! again. A thread row must never stay visible without its original post.

use std::sync::Arc;
use std::time::Duration;

use domains::{
    ActivityAction, CategoryId, NewPost, NewThread, Post, StoreError, Thread, ThreadCreationError,
    ThreadId, ThreadRepository, ThreadSummary, UserId, GUEST_USER_ID, MAX_TITLE_CHARS,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::activity::ActivityRecorder;
use crate::utils::{bounded, required_text};

/// Raw input for a new thread. Every field is required.
#[derive(Debug, Clone, Default)]
pub struct CreateThread {
    pub title: Option<String>,
    pub content: Option<String>,
    pub user_id: Option<UserId>,
    pub category_id: Option<CategoryId>,
}

/// Both rows of a committed thread.
#[derive(Debug, Clone)]
pub struct CreatedThread {
    pub thread: Thread,
    pub original_post: Post,
}

impl CreatedThread {
    pub fn thread_id(&self) -> ThreadId {
        self.thread.id
    }
}

#[derive(Clone)]
pub struct ThreadService {
    repo: Arc<dyn ThreadRepository>,
    activity: ActivityRecorder,
    store_timeout: Duration,
}

impl ThreadService {
    pub fn new(
        repo: Arc<dyn ThreadRepository>,
        activity: ActivityRecorder,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            activity,
            store_timeout,
        }
    }

    /// Returns every thread, newest first.
    pub async fn list_threads(&self, client_ip: &str) -> Result<Vec<ThreadSummary>, StoreError> {
        self.activity.record(
            GUEST_USER_ID,
            ActivityAction::RequestReceived,
            json!({ "ip": client_ip }),
        );

        bounded(self.store_timeout, "list_threads", self.repo.list_threads())
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch threads"))
    }

    /// Creates a thread together with its original post, or neither.
    pub async fn create_thread(
        &self,
        input: CreateThread,
    ) -> Result<CreatedThread, ThreadCreationError> {
        let (new_thread, content) = validate(input)?;
        let user_id = new_thread.user_id;

        // 1. Thread row; its id is needed by the post. Not bounded here: an
        // abandoned insert may still commit, and without its id the row could
        // never be compensated. The store adapter enforces its own statement
        // timeout instead.
        let thread = self
            .repo
            .insert_thread(new_thread)
            .await
            .map_err(|source| {
                warn!(user_id, error = %source, "thread insert failed");
                ThreadCreationError::ThreadInsert { source }
            })?;

        // 2. Original post.
        let new_post = NewPost {
            thread_id: thread.id,
            user_id,
            content,
            is_original_post: true,
        };
        let original_post = match bounded(
            self.store_timeout,
            "insert_post",
            self.repo.insert_post(new_post),
        )
        .await
        {
            Ok(post) => post,
            Err(source) => {
                warn!(thread_id = thread.id, error = %source, "original post insert failed, rolling back thread");
                let compensated = self.compensate(thread.id).await;
                return Err(ThreadCreationError::PostInsert {
                    thread_id: thread.id,
                    compensated,
                    source,
                });
            }
        };

        info!(thread_id = thread.id, post_id = original_post.id, user_id, "thread created");
        self.activity.record(
            user_id,
            ActivityAction::ThreadCreated,
            json!({ "threadId": thread.id, "title": thread.title }),
        );

        Ok(CreatedThread {
            thread,
            original_post,
        })
    }

    /// Deletes a thread whose original post could not be written.
    async fn compensate(&self, thread_id: ThreadId) -> bool {
        match bounded(
            self.store_timeout,
            "delete_thread",
            self.repo.delete_thread(thread_id),
        )
        .await
        {
            Ok(()) => {
                info!(thread_id, "rolled back thread without original post");
                true
            }
            Err(e) => {
                error!(
                    thread_id,
                    error = %e,
                    "ORPHANED THREAD: rollback failed, thread has no original post and needs manual removal"
                );
                false
            }
        }
    }
}

fn validate(input: CreateThread) -> Result<(NewThread, String), ThreadCreationError> {
    let title = required_text(input.title, "title").map_err(ThreadCreationError::Invalid)?;
    let content = required_text(input.content, "content").map_err(ThreadCreationError::Invalid)?;
    let user_id = input
        .user_id
        .ok_or_else(|| ThreadCreationError::Invalid("`userId` is required".into()))?;
    let category_id = input
        .category_id
        .ok_or_else(|| ThreadCreationError::Invalid("`categoryId` is required".into()))?;

    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ThreadCreationError::Invalid(format!(
            "`title` must be at most {MAX_TITLE_CHARS} characters"
        )));
    }

    Ok((
        NewThread {
            title,
            user_id,
            category_id,
        },
        content,
    ))
}
