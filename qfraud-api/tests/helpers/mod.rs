//! Test Helper Utilities
//!
//! Shared utilities for driving the qfraud-api router in integration tests

#![allow(dead_code)]

pub mod csv_fixtures;
pub mod requests;

pub use csv_fixtures::{header_line, separable_csv};
pub use requests::{get, multipart_upload, post_form, read_json, read_text};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use qfraud_api::services::{MailError, Mailer};
use qfraud_api::{build_router, AppState};
use qfraud_common::config::{IngestConfig, TrainingConfig};
use qfraud_common::events::EventBus;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// Mailer that keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl RecordingMailer {
    /// A mailer whose every send takes `delay`
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// `(recipient, temporary password)` pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until `count` messages were sent; mail goes out in the background
    pub async fn wait_for_sent(&self, count: usize) -> Vec<(String, String)> {
        tokio::time::timeout(Duration::from_secs(15), async {
            loop {
                let sent = self.sent();
                if sent.len() >= count {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("mail was not sent in time")
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_temporary_password(&self, to: &str, password: &str) -> Result<(), MailError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), password.to_string()));
        Ok(())
    }
}

/// A fully wired service backed by a temporary on-disk database
///
/// Keep the value alive for the whole test: dropping it removes the database.
pub struct TestApp {
    _dir: TempDir,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(TrainingConfig::default(), IngestConfig::default()).await
    }

    pub async fn with_config(training: TrainingConfig, ingest: IngestConfig) -> Self {
        Self::build(training, ingest, RecordingMailer::default()).await
    }

    pub async fn with_mailer(mailer: RecordingMailer) -> Self {
        Self::build(TrainingConfig::default(), IngestConfig::default(), mailer).await
    }

    async fn build(training: TrainingConfig, ingest: IngestConfig, mailer: RecordingMailer) -> Self {
        let dir = TempDir::new().unwrap();
        let pool = qfraud_api::db::init_database_pool(&dir.path().join("qfraud.db"))
            .await
            .unwrap();
        let mailer = Arc::new(mailer);
        let state = AppState::new(
            pool,
            EventBus::new(256),
            &training,
            &ingest,
            Arc::clone(&mailer) as Arc<dyn Mailer>,
        );

        Self {
            _dir: dir,
            state,
            mailer,
        }
    }

    /// Send one request through a fresh router
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        (status, read_json(response).await)
    }

    /// Upload `csv` under `project_name` and assert it was accepted
    pub async fn upload(&self, project_name: &str, csv: &str) -> Value {
        let (status, body) = self
            .send(multipart_upload(Some(project_name), Some(("data.csv", csv))))
            .await;
        assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
        body
    }
}
