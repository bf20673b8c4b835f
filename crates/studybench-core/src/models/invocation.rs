use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tool::{ToolKind, ToolParams};

/// One generated practice question (questions tool output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Tool output: plain text, or a structured list for the questions tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutput {
    Text(String),
    Questions(Vec<GeneratedQuestion>),
}

/// Raw outcome of one metered invocation as returned by the server.
///
/// `credits_used` is `None` when the server omits it; the engine then falls
/// back to the tool's nominal cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutput {
    pub output: ToolOutput,
    pub credits_used: Option<i64>,
}

/// A completed run held by the controller until reset.
///
/// `committed` starts false and becomes true exactly once after a
/// successful history commit; it is terminal for this result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub output: ToolOutput,
    pub credits_used: i64,
    pub committed: bool,
}

/// Record persisted by the history committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub tool: ToolKind,
    pub input_text: String,
    pub output: ToolOutput,
    pub parameters: ToolParams,
    pub credits_used: i64,
    pub requested_at: DateTime<Utc>,
}
