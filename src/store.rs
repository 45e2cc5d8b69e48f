//! Result persistence keyed by (user, project)
//!
//! Each key holds one current result plus an append-only history used for
//! trend forecasting. Values are bincode-encoded in a sled tree.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{InsightError, Result};
use crate::metrics::MetricsCollector;
use crate::models::AnalysisResult;

/// Persistence collaborator for analysis results
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Replace the current result and append it to history
    async fn save(&self, user_id: &str, project_id: &str, result: &AnalysisResult) -> Result<()>;

    /// Current result, if any
    async fn load(&self, user_id: &str, project_id: &str) -> Result<Option<AnalysisResult>>;

    /// Drop the current result; history is kept
    async fn clear(&self, user_id: &str, project_id: &str) -> Result<()>;

    /// Every saved result, oldest first
    async fn history(&self, user_id: &str, project_id: &str) -> Result<Vec<AnalysisResult>>;
}

/// sled-backed store
pub struct SledResultStore {
    db: sled::Db,
    metrics: MetricsCollector,
}

impl SledResultStore {
    /// Open or create the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        debug!(path = %path.display(), "Opened result store");
        Ok(Self {
            db,
            metrics: MetricsCollector::default(),
        })
    }

    fn current_key(user_id: &str, project_id: &str) -> Vec<u8> {
        format!("current:{user_id}:{project_id}").into_bytes()
    }

    fn history_prefix(user_id: &str, project_id: &str) -> Vec<u8> {
        format!("history:{user_id}:{project_id}:").into_bytes()
    }

    fn history_key(user_id: &str, project_id: &str, result: &AnalysisResult) -> Vec<u8> {
        // Zero-padded so lexicographic order is chronological
        let nanos = result.created_at.timestamp_nanos_opt().unwrap_or(i64::MAX).max(0);
        let mut key = Self::history_prefix(user_id, project_id);
        key.extend_from_slice(format!("{nanos:020}").as_bytes());
        key
    }

    fn track<T>(&self, operation: &str, outcome: Result<T>) -> Result<T> {
        self.metrics.record_store_operation(operation, outcome.is_ok());
        outcome
    }
}

#[async_trait]
impl ResultStore for SledResultStore {
    async fn save(&self, user_id: &str, project_id: &str, result: &AnalysisResult) -> Result<()> {
        let outcome = (|| -> Result<()> {
            let data = bincode::serialize(result)?;
            let mut key = Self::history_key(user_id, project_id, result);
            // Two saves within the same nanosecond keep both entries
            while self.db.contains_key(&key)? {
                key.push(b'+');
            }
            self.db.insert(key, data.clone())?;
            self.db.insert(Self::current_key(user_id, project_id), data)?;
            self.db.flush()?;
            Ok(())
        })();
        self.track("save", outcome)
    }

    async fn load(&self, user_id: &str, project_id: &str) -> Result<Option<AnalysisResult>> {
        let outcome = (|| -> Result<Option<AnalysisResult>> {
            match self.db.get(Self::current_key(user_id, project_id))? {
                Some(data) => Ok(Some(bincode::deserialize(&data)?)),
                None => Ok(None),
            }
        })();
        self.track("load", outcome)
    }

    async fn clear(&self, user_id: &str, project_id: &str) -> Result<()> {
        let outcome = (|| -> Result<()> {
            self.db.remove(Self::current_key(user_id, project_id))?;
            self.db.flush()?;
            Ok(())
        })();
        self.track("clear", outcome)
    }

    async fn history(&self, user_id: &str, project_id: &str) -> Result<Vec<AnalysisResult>> {
        let outcome = self
            .db
            .scan_prefix(Self::history_prefix(user_id, project_id))
            .map(|entry| -> Result<AnalysisResult> {
                let (_, data) = entry?;
                Ok(bincode::deserialize(&data)?)
            })
            .collect::<Result<Vec<_>>>();
        self.track("history", outcome)
    }
}

type Key = (String, String);

/// Wrapper that keeps serving results while the inner store is down.
///
/// Reads fall back to the last result seen for the key, then to an empty
/// default payload. Write failures are still returned so the caller can
/// report them.
pub struct ResilientStore {
    inner: Arc<dyn ResultStore>,
    last_known: RwLock<HashMap<Key, AnalysisResult>>,
    metrics: MetricsCollector,
}

impl ResilientStore {
    /// Wrap `inner`
    #[must_use]
    pub fn new(inner: Arc<dyn ResultStore>) -> Self {
        Self {
            inner,
            last_known: RwLock::new(HashMap::new()),
            metrics: MetricsCollector::default(),
        }
    }

    fn key(user_id: &str, project_id: &str) -> Key {
        (user_id.to_string(), project_id.to_string())
    }

    async fn remember(&self, result: &AnalysisResult) {
        self.last_known.write().await.insert(
            Self::key(&result.user_id, &result.project_id),
            result.clone(),
        );
    }

    async fn fallback(&self, user_id: &str, project_id: &str, error: &InsightError) -> AnalysisResult {
        self.metrics.record_degradation("store_unavailable");
        let cached = self
            .last_known
            .read()
            .await
            .get(&Self::key(user_id, project_id))
            .cloned();
        match cached {
            Some(result) => {
                warn!(user_id, project_id, error = %error, "Store unavailable, serving last known result");
                result
            }
            None => {
                warn!(user_id, project_id, error = %error, "Store unavailable, serving default result");
                AnalysisResult::empty(user_id, project_id)
            }
        }
    }
}

#[async_trait]
impl ResultStore for ResilientStore {
    async fn save(&self, user_id: &str, project_id: &str, result: &AnalysisResult) -> Result<()> {
        self.remember(result).await;
        self.inner.save(user_id, project_id, result).await
    }

    async fn load(&self, user_id: &str, project_id: &str) -> Result<Option<AnalysisResult>> {
        match self.inner.load(user_id, project_id).await {
            Ok(Some(result)) => {
                self.remember(&result).await;
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(e) => Ok(Some(self.fallback(user_id, project_id, &e).await)),
        }
    }

    async fn clear(&self, user_id: &str, project_id: &str) -> Result<()> {
        self.last_known
            .write()
            .await
            .remove(&Self::key(user_id, project_id));
        self.inner.clear(user_id, project_id).await
    }

    async fn history(&self, user_id: &str, project_id: &str) -> Result<Vec<AnalysisResult>> {
        match self.inner.history(user_id, project_id).await {
            Ok(history) => Ok(history),
            Err(e) => {
                self.metrics.record_degradation("store_unavailable");
                warn!(user_id, project_id, error = %e, "History unavailable, using last known result");
                Ok(self
                    .last_known
                    .read()
                    .await
                    .get(&Self::key(user_id, project_id))
                    .cloned()
                    .into_iter()
                    .collect())
            }
        }
    }
}
