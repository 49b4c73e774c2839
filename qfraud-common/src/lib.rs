//! # qfraud Common Library
//!
//! Shared code for the qfraud service crates:
//! - Error type and result alias
//! - Bootstrap configuration (root folder, TOML file, compiled defaults)
//! - Notification events (`QfraudEvent`) and the `EventBus`
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
