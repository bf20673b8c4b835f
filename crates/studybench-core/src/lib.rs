//! Studybench Core Library
//!
//! This crate provides the shared domain models, error taxonomy,
//! configuration, and external-service contracts used by the Studybench
//! engine, API client, and CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::{AttachmentCaps, EngineConfig};
pub use error::{BalanceError, InvokeError, ToolError};
pub use services::{BalanceService, HistoryCommitter, MeteredInvoker, TextExtractor};
