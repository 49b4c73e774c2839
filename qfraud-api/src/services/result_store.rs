//! In-memory store of finished training jobs
//!
//! Keyed by project tag, last writer wins. Entries expire after a TTL and
//! the oldest entry is evicted once the store is full. Nothing here survives
//! a restart; the persisted project summary is the durable record.

use qfraud_common::events::TrainingReport;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Result of one finished job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Done(Box<TrainingReport>),
    Failed { message: String },
}

/// A successful outcome serializes as the report itself, a failure as
/// `{"status":"error","message":...}`
impl Serialize for JobOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JobOutcome::Done(report) => report.serialize(serializer),
            JobOutcome::Failed { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", "error")?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

#[derive(Debug)]
struct Entry {
    outcome: JobOutcome,
    stored_at: Instant,
}

/// Bounded, expiring map of project tag to job outcome
#[derive(Debug)]
pub struct JobResultStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Option<Duration>,
    max_entries: usize,
}

impl JobResultStore {
    /// `ttl` of `None` disables expiry; `max_entries` is at least 1
    pub fn new(ttl: Option<Duration>, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Store the outcome for a project, replacing any earlier one
    pub async fn insert(&self, project_name: impl Into<String>, outcome: JobOutcome) {
        let project_name = project_name.into();
        let mut entries = self.entries.write().await;
        self.purge_expired(&mut entries);

        entries.insert(
            project_name,
            Entry {
                outcome,
                stored_at: Instant::now(),
            },
        );

        while entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(project_name = %key, "Evicting oldest job result");
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Outcome for a project, if present and not expired
    pub async fn get(&self, project_name: &str) -> Option<JobOutcome> {
        {
            let entries = self.entries.read().await;
            match entries.get(project_name) {
                None => return None,
                Some(entry) if !self.is_expired(entry) => return Some(entry.outcome.clone()),
                Some(_) => {}
            }
        }

        // Expired: drop it so it reads as absent from now on
        let mut entries = self.entries.write().await;
        if entries.get(project_name).is_some_and(|entry| self.is_expired(entry)) {
            entries.remove(project_name);
        }
        None
    }

    pub async fn remove(&self, project_name: &str) -> Option<JobOutcome> {
        self.entries
            .write()
            .await
            .remove(project_name)
            .map(|entry| entry.outcome)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.write().await;
        self.purge_expired(&mut entries);
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
    }

    fn purge_expired(&self, entries: &mut HashMap<String, Entry>) {
        if self.ttl.is_some() {
            entries.retain(|_, entry| !self.is_expired(entry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(message: &str) -> JobOutcome {
        JobOutcome::Failed {
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = JobResultStore::new(None, 10);
        store.insert("alpha", failed("first")).await;
        store.insert("alpha", failed("second")).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("alpha").await, Some(failed("second")));
        assert_eq!(store.get("beta").await, None);
    }

    #[tokio::test]
    async fn test_oldest_entry_evicted_when_full() {
        let store = JobResultStore::new(None, 2);
        store.insert("a", failed("a")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.insert("b", failed("b")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.insert("c", failed("c")).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get("a").await.is_none());
        assert!(store.get("b").await.is_some());
        assert!(store.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = JobResultStore::new(Some(Duration::from_millis(30)), 10);
        store.insert("alpha", failed("boom")).await;
        assert!(store.get("alpha").await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get("alpha").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = JobResultStore::new(None, 10);
        store.insert("a", failed("a")).await;
        store.insert("b", failed("b")).await;

        assert_eq!(store.remove("a").await, Some(failed("a")));
        assert_eq!(store.len().await, 1);
        store.clear().await;
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_failed_outcome_serializes_as_error_payload() {
        let json = serde_json::to_value(failed("No data found for project: x")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "No data found for project: x");
    }
}
