//! # Test fixtures
//!
//! Builds the full router over in-memory adapters and exposes the stores so
//! tests can assert on persisted state, not only on responses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_adapters::{router, AppState, Metrics};
use async_trait::async_trait;
use auth_adapters::{Argon2Hasher, JwtIssuer};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use domains::{
    ActivityLog, ActivityLogEntry, Category, CredentialHasher, NewPost, NewThread, NewUser, Post,
    StoreError, Thread, ThreadId, ThreadRepository, ThreadSummary, User, UserRepository,
};
use secrecy::SecretString;
use serde_json::Value;
use services::{ActivityRecorder, AuthService, ThreadService};
use storage_adapters::{InMemoryActivityLog, InMemoryForumStore};
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub const SEED_PASSWORD: &str = "correct horse battery";
pub const STORE_TIMEOUT: Duration = Duration::from_millis(200);
const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Switches that make the wrapped repository fail on purpose.
#[derive(Default)]
pub struct Faults {
    pub fail_thread_insert: AtomicBool,
    /// Thread insert commits, then answers well after the store timeout.
    pub slow_thread_ack: AtomicBool,
    pub fail_post_insert: AtomicBool,
    /// Post insert never answers; the coordinator's timeout must fire.
    pub stall_post_insert: AtomicBool,
    pub fail_thread_delete: AtomicBool,
}

impl Faults {
    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn on(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }
}

/// Delegates to the in-memory store unless a fault is switched on.
pub struct FaultyThreadRepository {
    inner: Arc<InMemoryForumStore>,
    pub faults: Faults,
}

impl FaultyThreadRepository {
    pub fn new(inner: Arc<InMemoryForumStore>) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }
}

#[async_trait]
impl ThreadRepository for FaultyThreadRepository {
    async fn insert_thread(&self, thread: NewThread) -> Result<Thread, StoreError> {
        if Faults::on(&self.faults.fail_thread_insert) {
            return Err(StoreError::Unavailable("injected thread insert failure".into()));
        }
        let row = self.inner.insert_thread(thread).await?;
        if Faults::on(&self.faults.slow_thread_ack) {
            tokio::time::sleep(STORE_TIMEOUT * 3).await;
        }
        Ok(row)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        if Faults::on(&self.faults.stall_post_insert) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if Faults::on(&self.faults.fail_post_insert) {
            return Err(StoreError::Other("injected post insert failure".into()));
        }
        self.inner.insert_post(post).await
    }

    async fn delete_thread(&self, id: ThreadId) -> Result<(), StoreError> {
        if Faults::on(&self.faults.fail_thread_delete) {
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete_thread(id).await
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, StoreError> {
        self.inner.list_threads().await
    }
}

pub struct TestApp {
    router: Router,
    worker: JoinHandle<()>,
    pub store: Arc<InMemoryForumStore>,
    pub threads: Arc<FaultyThreadRepository>,
    pub activity_log: Arc<InMemoryActivityLog>,
    pub thread_service: ThreadService,
    /// Seeded author, password [`SEED_PASSWORD`].
    pub user: User,
    pub category: Category,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = Arc::new(InMemoryForumStore::new());
        let threads = Arc::new(FaultyThreadRepository::new(Arc::clone(&store)));
        let activity_log = Arc::new(InMemoryActivityLog::new());

        let hasher = Arc::new(Argon2Hasher::new());
        let user = store
            .insert_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: hasher
                    .hash_password(SEED_PASSWORD)
                    .expect("hash seed password"),
            })
            .await
            .expect("seed user");
        let category = store.add_category("General");

        let tokens = JwtIssuer::new(
            &SecretString::from(JWT_SECRET.to_string()),
            Duration::from_secs(3600),
        )
        .expect("jwt issuer");

        let (recorder, worker) = ActivityRecorder::spawn(
            Arc::clone(&activity_log) as Arc<dyn ActivityLog>,
            64,
        );
        let thread_service = ThreadService::new(
            Arc::clone(&threads) as Arc<dyn ThreadRepository>,
            recorder.clone(),
            STORE_TIMEOUT,
        );
        let auth = AuthService::new(
            Arc::clone(&store) as Arc<dyn UserRepository>,
            hasher,
            Arc::new(tokens),
            recorder,
            STORE_TIMEOUT,
        );

        let state = AppState {
            threads: thread_service.clone(),
            auth,
            activity_log: Some(Arc::clone(&activity_log) as Arc<dyn ActivityLog>),
            metrics: Arc::new(Metrics::new()),
        };

        Self {
            router: router(state),
            worker,
            store,
            threads,
            activity_log,
            thread_service,
            user,
            category,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        json_response(self.send(request).await).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("valid request");
        json_response(self.send(request).await).await
    }

    /// Drops every handle to the activity queue, waits for the worker to
    /// drain, and returns what reached the activity log.
    pub async fn shutdown(self) -> Vec<ActivityLogEntry> {
        let TestApp {
            router,
            worker,
            thread_service,
            activity_log,
            ..
        } = self;
        drop(router);
        drop(thread_service);
        worker.await.expect("activity worker panicked");
        activity_log.entries()
    }
}

pub async fn json_response(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, body)
}
