//! Prometheus counters for the write endpoints.

use prometheus_client::encoding::{text::encode, EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::{counter::Counter, family::Family};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum ThreadOutcome {
    Created,
    Invalid,
    ThreadInsertFailed,
    /// Original post failed, thread row rolled back.
    Compensated,
    /// Original post failed and the rollback failed too.
    Orphaned,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ThreadLabels {
    pub outcome: ThreadOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum AuthKind {
    Register,
    Login,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum AuthOutcome {
    Success,
    Rejected,
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AuthLabels {
    pub kind: AuthKind,
    pub outcome: AuthOutcome,
}

pub struct Metrics {
    registry: Registry,
    thread_creations: Family<ThreadLabels, Counter>,
    auth_attempts: Family<AuthLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let thread_creations = Family::<ThreadLabels, Counter>::default();
        let auth_attempts = Family::<AuthLabels, Counter>::default();

        registry.register(
            "forum_thread_creations",
            "Thread creation attempts by outcome",
            thread_creations.clone(),
        );
        registry.register(
            "forum_auth_attempts",
            "Registration and login attempts by outcome",
            auth_attempts.clone(),
        );

        Self {
            registry,
            thread_creations,
            auth_attempts,
        }
    }

    pub fn thread_creation(&self, outcome: ThreadOutcome) {
        self.thread_creations
            .get_or_create(&ThreadLabels { outcome })
            .inc();
    }

    pub fn auth_attempt(&self, kind: AuthKind, outcome: AuthOutcome) {
        self.auth_attempts
            .get_or_create(&AuthLabels { kind, outcome })
            .inc();
    }

    /// OpenMetrics text exposition of every registered metric.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
