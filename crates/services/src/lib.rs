//! # services
//!
//! Application use cases of the forum backend. Services only talk to the
//! outside world through the ports defined in `domains`.

pub mod activity;
pub mod auth;
pub mod threads;
pub mod utils;

pub use activity::ActivityRecorder;
pub use auth::{AuthService, LoggedIn, LoginUser, RegisterUser};
pub use threads::{CreateThread, CreatedThread, ThreadService};
