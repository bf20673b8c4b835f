//! Shared limits and fixed strings for the invocation pipeline.

/// Maximum number of attachments per submission.
pub const MAX_ATTACHMENTS: usize = 5;

/// Size cap for image attachments (5 MB).
pub const IMAGE_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Size cap for non-image attachments (10 MB).
pub const DOCUMENT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Separator between the typed text and each extracted attachment text.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Shown when a failed invocation carries no server-provided message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
