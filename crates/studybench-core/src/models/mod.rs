//! Domain models shared across the Studybench crates.

pub mod attachment;
pub mod credits;
pub mod invocation;
pub mod tool;

pub use attachment::{Attachment, AttachmentKind, ExtractionState, SourceFile};
pub use credits::CreditBalance;
pub use invocation::{
    GeneratedQuestion, HistoryRecord, InvocationOutput, InvocationResult, ToolOutput,
};
pub use tool::{
    ExplainMode, QuestionType, RewriteStyle, SummaryMode, ToolKind, ToolParams, ToolProfile,
};
