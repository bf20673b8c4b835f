//! Contracts for the external collaborators of the invocation pipeline.
//!
//! The engine consumes these as opaque services; exact wire formats are the
//! implementations' concern. `studybench-api-client` provides the HTTP
//! implementations, and `studybench-engine::testing` provides mocks.

use async_trait::async_trait;

use crate::error::{BalanceError, InvokeError};
use crate::models::{
    CreditBalance, HistoryRecord, InvocationOutput, SourceFile, ToolKind, ToolParams,
};

/// Turns a raw file into extracted text.
///
/// Failures surface on the owning attachment; they are never retried
/// automatically.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// OCR text out of an image file.
    async fn extract_from_image(&self, file: &SourceFile) -> anyhow::Result<String>;

    /// Text out of a document file (pdf, doc, plain text).
    async fn extract_from_document(&self, file: &SourceFile) -> anyhow::Result<String>;
}

/// The metered backend operation. Called at most once per accepted user
/// action; every call may be billed.
#[async_trait]
pub trait MeteredInvoker: Send + Sync {
    async fn invoke(
        &self,
        tool: ToolKind,
        text: &str,
        params: &ToolParams,
    ) -> Result<InvocationOutput, InvokeError>;
}

/// Authoritative source for the user's credit balance.
#[async_trait]
pub trait BalanceService: Send + Sync {
    async fn get_balance(&self) -> Result<CreditBalance, BalanceError>;
}

/// Persists a successful result to permanent history, independent of
/// generation.
#[async_trait]
pub trait HistoryCommitter: Send + Sync {
    async fn save(&self, record: &HistoryRecord) -> anyhow::Result<()>;
}
