//! One-time login codes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long an issued code stays valid.
pub const CODE_TTL: Duration = Duration::from_secs(60 * 60);

/// How often expired codes are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Issues and checks short-lived numeric codes keyed by subject.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Issues a fresh 6-digit code for `subject`, replacing any previous one.
    async fn issue(&self, subject: &str) -> String;

    /// Checks `code` for `subject`.
    ///
    /// A code can be checked once: the entry is removed whether or not it
    /// matches.
    async fn verify(&self, subject: &str, code: &str) -> bool;
}

#[derive(Debug)]
struct Entry {
    code: String,
    issued_at: Instant,
}

/// Mutex-guarded in-process code store.
#[derive(Debug, Clone)]
pub struct InMemoryOtpStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl Default for InMemoryOtpStore {
    fn default() -> Self {
        Self::new(CODE_TTL)
    }
}

impl InMemoryOtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::default(),
            ttl,
        }
    }

    /// Drops every code older than the TTL. Returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.issued_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Starts the periodic sweep. Abort the handle to stop it.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "swept expired login codes");
                }
            }
        })
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn issue(&self, subject: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        self.entries.lock().await.insert(
            subject.to_string(),
            Entry {
                code: code.clone(),
                issued_at: Instant::now(),
            },
        );
        code
    }

    async fn verify(&self, subject: &str, code: &str) -> bool {
        match self.entries.lock().await.remove(subject) {
            Some(entry) => entry.issued_at.elapsed() <= self.ttl && entry.code == code,
            None => false,
        }
    }
}
