use axum::routing::{get, post};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, threads};
use crate::middleware::{cors_policy, request_span, REQUEST_ID_HEADER};
use crate::state::AppState;

/// Builds the complete HTTP surface.
///
/// ```text
/// GET  /api/threads
/// POST /api/threads
/// POST /api/auth/register
/// POST /api/auth/login
/// GET  /health
/// GET  /metrics
/// ```
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/threads",
            get(threads::list_threads).post(threads::create_thread),
        )
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        // Layers run bottom-up: the request id is set before the trace span opens.
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(cors_policy())
        .with_state(state)
}
