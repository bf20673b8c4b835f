//! Error types module
//!
//! The failure taxonomy of the tool invocation pipeline. Local validation
//! errors are detected without any network call and are always recoverable
//! by user edit; rate limits and insufficient credits carry the exact
//! figures a front end needs to render a precise message.

use crate::constants::GENERIC_FAILURE_MESSAGE;

/// Unified error for one submission or commit attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("nothing to send")]
    EmptyInput,

    #[error("input is {len} characters, the limit for this tool is {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("still processing attachments")]
    AttachmentsPending,

    #[error("attachment limit reached: at most {max} files per submission")]
    AttachmentLimitExceeded { max: usize },

    #[error("{name} is too large: {size_bytes} bytes, limit is {max_bytes}")]
    AttachmentTooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("could not read text from: {}", .files.join(", "))]
    ExtractionFailed { files: Vec<String> },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("please wait {remaining_seconds}s before submitting again")]
    CooldownActive { remaining_seconds: u64 },

    #[error("rate limited: retry in {remaining_seconds}s")]
    RateLimited { remaining_seconds: u64 },

    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("no result to save")]
    NothingToCommit,

    #[error("{0}")]
    Service(String),
}

impl ToolError {
    /// True when the error was produced locally, without any network call.
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            ToolError::RateLimited { .. }
                | ToolError::InsufficientCredits { .. }
                | ToolError::Service(_)
        )
    }

    /// Whether retrying the same action later can succeed without the user
    /// changing anything locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ToolError::RateLimited { .. }
                | ToolError::CooldownActive { .. }
                | ToolError::Service(_)
        )
    }

    /// Client-facing message (hides raw transport details).
    pub fn user_message(&self) -> String {
        match self {
            ToolError::Service(message) if message.trim().is_empty() => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Typed failure of the metered invocation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error("rate limited: retry in {remaining_seconds}s")]
    RateLimited { remaining_seconds: u64 },

    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("{0}")]
    Other(String),
}

/// Failure of the balance service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    #[error("not authorized")]
    Unauthorized,

    #[error("{0}")]
    Other(String),
}
