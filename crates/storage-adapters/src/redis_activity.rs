//! # Redis activity stream
//!
//! Appends activity documents to a capped Redis stream. Each stream entry
//! carries the entry id, action and the whole entry serialised as JSON.
//!
//! Readiness is tracked by a background `PING` probe instead of being checked
//! on every write, so an unreachable server costs no latency on the write path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{redis, Config, Pool, PoolConfig, Runtime, Timeouts};
use domains::{ActivityLog, ActivityLogEntry, StoreError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct RedisActivityLog {
    pool: Pool,
    stream: String,
    max_len: usize,
    /// Bounds pool checkout, connecting and every command.
    timeout: Duration,
    ready: Arc<AtomicBool>,
}

impl RedisActivityLog {
    /// Builds the pool. No connection is made until the first probe or write.
    pub fn new(
        url: &str,
        stream: impl Into<String>,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(timeout);
        timeouts.create = Some(timeout);
        timeouts.recycle = Some(timeout);
        let mut pool_config = PoolConfig::default();
        pool_config.timeouts = timeouts;

        let mut config = Config::from_url(url);
        config.pool = Some(pool_config);
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            pool,
            stream: stream.into(),
            max_len,
            timeout,
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Pings once and updates the readiness flag.
    pub async fn probe(&self) -> bool {
        let ready = ping(&self.pool, self.timeout).await;
        let was_ready = self.ready.swap(ready, Ordering::SeqCst);
        match (was_ready, ready) {
            (false, true) => info!(stream = %self.stream, "activity log connected"),
            (true, false) => warn!(stream = %self.stream, "activity log connection lost, entries will be skipped"),
            _ => {}
        }
        ready
    }

    /// Re-probes readiness every `interval` until the task is aborted.
    pub fn spawn_readiness_probe(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                this.probe().await;
            }
        })
    }
}

async fn ping(pool: &Pool, timeout: Duration) -> bool {
    let Ok(mut conn) = pool.get().await else {
        return false;
    };
    let ping = redis::cmd("PING");
    matches!(
        tokio::time::timeout(timeout, ping.query_async::<String>(&mut conn)).await,
        Ok(Ok(_))
    )
}

#[async_trait]
impl ActivityLog for RedisActivityLog {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), StoreError> {
        let document =
            serde_json::to_string(entry).map_err(|e| StoreError::Other(e.to_string()))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut xadd = redis::cmd("XADD");
        xadd.arg(&self.stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg("id")
            .arg(entry.id.to_string())
            .arg("action")
            .arg(entry.action.as_str())
            .arg("entry")
            .arg(document);
        tokio::time::timeout(self.timeout, xadd.query_async::<String>(&mut conn))
            .await
            .map_err(|_| StoreError::Timeout("xadd"))?
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn starts_not_ready_and_stays_so_without_server() {
        // Port 1 is reserved; nothing answers there.
        let log = RedisActivityLog::new("redis://127.0.0.1:1", "activity_logs", 1000, TIMEOUT)
            .unwrap();
        assert!(!log.is_ready());
        assert!(!log.probe().await);
        assert!(!log.is_ready());
    }

    #[tokio::test]
    async fn unreachable_host_fails_within_the_pool_timeout() {
        // TEST-NET-1 is never routed; a connect attempt hangs until timed out.
        let log = RedisActivityLog::new("redis://192.0.2.1:6379", "activity_logs", 1000, TIMEOUT)
            .unwrap();
        let entry = ActivityLogEntry::new(
            domains::GUEST_USER_ID,
            domains::ActivityAction::RequestReceived,
            serde_json::json!({}),
        );

        let probed = tokio::time::timeout(Duration::from_secs(5), log.probe()).await;
        assert_eq!(probed, Ok(false));
        let appended = tokio::time::timeout(Duration::from_secs(5), log.append(&entry)).await;
        assert!(matches!(appended, Ok(Err(_))));
    }
}
