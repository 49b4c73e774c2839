//! Data models for qfraud-api

pub mod summary;
pub mod transaction;
pub mod user;

pub use summary::{NewProjectSummary, ProjectSummary};
pub use transaction::{StoredTransaction, TransactionRow, FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN};
pub use user::{User, UserProfile};
