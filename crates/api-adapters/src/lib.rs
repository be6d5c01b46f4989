//! # api-adapters
//!
//! The web routing layer of the forum backend.
//!
//! The HTTP surface is compiled with the `web-axum` feature; metrics are
//! framework independent and always available.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use routes::router;
#[cfg(feature = "web-axum")]
pub use state::AppState;
