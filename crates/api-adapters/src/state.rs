use std::sync::Arc;

use domains::ActivityLog;
use services::{AuthService, ThreadService};

use crate::metrics::Metrics;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub threads: ThreadService,
    pub auth: AuthService,
    /// `None` when activity logging is disabled.
    pub activity_log: Option<Arc<dyn ActivityLog>>,
    pub metrics: Arc<Metrics>,
}
