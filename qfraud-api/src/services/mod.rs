//! Service layer: ingestion, training jobs, credentials and mail

pub mod ingest;
pub mod job_dispatcher;
pub mod mailer;
pub mod passwords;
pub mod result_store;
pub mod training_orchestrator;

pub use ingest::{CsvIngestor, IngestError, IngestSummary};
pub use job_dispatcher::{DispatchError, TrainingDispatcher};
pub use mailer::{mailer_from_config, LogMailer, MailError, Mailer, SendGridMailer};
pub use result_store::{JobOutcome, JobResultStore};
pub use training_orchestrator::TrainingOrchestrator;
