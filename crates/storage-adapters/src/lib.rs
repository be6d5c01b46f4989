//! # storage-adapters
//!
//! Implementations of the `domains` store ports.
//!
//! - [`memory`]: process-local store, always compiled
//! - `postgres`: relational store over `sqlx` (feature `db-postgres`)
//! - `redis_activity`: activity stream over `deadpool-redis` (feature `redis`)

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis_activity;

pub use memory::{InMemoryActivityLog, InMemoryForumStore};

#[cfg(feature = "db-postgres")]
pub use postgres::PgForumStore;

#[cfg(feature = "redis")]
pub use redis_activity::RedisActivityLog;
