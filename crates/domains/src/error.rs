//! # Errors
//!
//! Centralized error handling for the forum.
//! Maps store, workflow and auth failures to actionable error types.

use std::fmt;

use thiserror::Error;

use crate::models::ThreadId;

/// Failure reported by a store adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. duplicate email)
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A referenced row does not exist (e.g. unknown category)
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// The row addressed by the operation does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Connectivity failure (pool exhausted, connection refused)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the configured limit
    #[error("store call `{0}` timed out")]
    Timeout(&'static str),

    #[error("store error: {0}")]
    Other(String),
}

/// Which write of the thread-creation workflow failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPhase {
    Thread,
    Post,
}

impl CreationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreationPhase::Thread => "thread",
            CreationPhase::Post => "post",
        }
    }
}

impl fmt::Display for CreationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged failure of the thread + original post workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadCreationError {
    #[error("validation error: {0}")]
    Invalid(String),

    /// Nothing was persisted; the store rolls back a statement it times out.
    #[error("failed to create thread: {source}")]
    ThreadInsert { source: StoreError },

    /// The thread row was written but its original post was not.
    /// `compensated` tells whether the thread row was deleted again.
    #[error("failed to create original post for thread {thread_id} (compensated: {compensated}): {source}")]
    PostInsert {
        thread_id: ThreadId,
        compensated: bool,
        source: StoreError,
    },
}

impl ThreadCreationError {
    pub fn phase(&self) -> Option<CreationPhase> {
        match self {
            ThreadCreationError::Invalid(_) => None,
            ThreadCreationError::ThreadInsert { .. } => Some(CreationPhase::Thread),
            ThreadCreationError::PostInsert { .. } => Some(CreationPhase::Post),
        }
    }

    /// A thread row survived without its original post.
    pub fn is_orphan(&self) -> bool {
        matches!(
            self,
            ThreadCreationError::PostInsert {
                compensated: false,
                ..
            }
        )
    }
}

/// Password hashing / token issuing failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token error: {0}")]
    Token(String),
}

/// The primary error type for service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation failure (e.g. missing field, empty title)
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists (e.g. duplicate email)
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    ThreadCreation(#[from] ThreadCreationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Infrastructure failure outside the store (e.g. a panicked blocking task)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// A specialized Result type for forum services.
pub type Result<T> = std::result::Result<T, AppError>;
