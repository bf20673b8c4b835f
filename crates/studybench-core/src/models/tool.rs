use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four metered study tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Summarize,
    Questions,
    Explain,
    Rewrite,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Summarize => "summarize",
            ToolKind::Questions => "questions",
            ToolKind::Explain => "explain",
            ToolKind::Rewrite => "rewrite",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    Concise,
    Detailed,
    Bullets,
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concise" => Ok(Self::Concise),
            "detailed" => Ok(Self::Detailed),
            "bullets" => Ok(Self::Bullets),
            other => Err(format!(
                "unknown summary mode '{other}' (expected concise, detailed, or bullets)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    OpenEnded,
    TrueFalse,
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice" | "multiple-choice" => Ok(Self::MultipleChoice),
            "open_ended" | "open-ended" => Ok(Self::OpenEnded),
            "true_false" | "true-false" => Ok(Self::TrueFalse),
            other => Err(format!(
                "unknown question type '{other}' (expected multiple_choice, open_ended, or true_false)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainMode {
    Simple,
    Technical,
}

impl FromStr for ExplainMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "technical" => Ok(Self::Technical),
            other => Err(format!(
                "unknown explain mode '{other}' (expected simple or technical)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStyle {
    Formal,
    Casual,
    Academic,
    Simplified,
}

impl FromStr for RewriteStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formal" => Ok(Self::Formal),
            "casual" => Ok(Self::Casual),
            "academic" => Ok(Self::Academic),
            "simplified" => Ok(Self::Simplified),
            other => Err(format!(
                "unknown rewrite style '{other}' (expected formal, casual, academic, or simplified)"
            )),
        }
    }
}

/// Per-invocation tool parameters, tagged by tool on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolParams {
    Summarize {
        mode: SummaryMode,
    },
    Questions {
        question_type: QuestionType,
        count: u8,
    },
    Explain {
        mode: ExplainMode,
        with_examples: bool,
    },
    Rewrite {
        style: RewriteStyle,
    },
}

impl ToolParams {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolParams::Summarize { .. } => ToolKind::Summarize,
            ToolParams::Questions { .. } => ToolKind::Questions,
            ToolParams::Explain { .. } => ToolKind::Explain,
            ToolParams::Rewrite { .. } => ToolKind::Rewrite,
        }
    }
}

/// Static per-tool configuration: one engine instance per tool, configured
/// once with its input limit and nominal cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolProfile {
    pub kind: ToolKind,
    pub max_input_chars: usize,
    pub nominal_cost: i64,
}

impl ToolProfile {
    pub fn default_for(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Summarize => Self {
                kind,
                max_input_chars: 20_000,
                nominal_cost: 1,
            },
            ToolKind::Questions => Self {
                kind,
                max_input_chars: 20_000,
                nominal_cost: 2,
            },
            ToolKind::Explain => Self {
                kind,
                max_input_chars: 15_000,
                nominal_cost: 1,
            },
            ToolKind::Rewrite => Self {
                kind,
                max_input_chars: 20_000,
                nominal_cost: 1,
            },
        }
    }
}
