//! Configuration module
//!
//! Engine configuration is read from the environment with named defaults,
//! so every limit can be tuned per deployment without code changes.

use std::env;

use crate::constants::{DOCUMENT_MAX_BYTES, IMAGE_MAX_BYTES, MAX_ATTACHMENTS};
use crate::models::{AttachmentKind, ToolKind, ToolProfile};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Attachment count and per-kind size limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentCaps {
    pub max_files: usize,
    pub image_max_bytes: u64,
    pub document_max_bytes: u64,
}

impl AttachmentCaps {
    /// Size cap for a given attachment kind: the image cap for images, the
    /// document cap for everything else.
    pub fn max_bytes_for(&self, kind: AttachmentKind) -> u64 {
        match kind {
            AttachmentKind::Image => self.image_max_bytes,
            _ => self.document_max_bytes,
        }
    }
}

impl Default for AttachmentCaps {
    fn default() -> Self {
        Self {
            max_files: MAX_ATTACHMENTS,
            image_max_bytes: IMAGE_MAX_BYTES,
            document_max_bytes: DOCUMENT_MAX_BYTES,
        }
    }
}

/// Engine configuration: attachment caps and the four tool profiles.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub attachments: AttachmentCaps,
    pub summarize: ToolProfile,
    pub questions: ToolProfile,
    pub explain: ToolProfile,
    pub rewrite: ToolProfile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attachments: AttachmentCaps::default(),
            summarize: ToolProfile::default_for(ToolKind::Summarize),
            questions: ToolProfile::default_for(ToolKind::Questions),
            explain: ToolProfile::default_for(ToolKind::Explain),
            rewrite: ToolProfile::default_for(ToolKind::Rewrite),
        }
    }
}

impl EngineConfig {
    pub fn profile(&self, kind: ToolKind) -> ToolProfile {
        match kind {
            ToolKind::Summarize => self.summarize,
            ToolKind::Questions => self.questions,
            ToolKind::Explain => self.explain,
            ToolKind::Rewrite => self.rewrite,
        }
    }

    /// Load configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    ///
    /// Recognized variables: `STUDYBENCH_MAX_ATTACHMENTS`,
    /// `STUDYBENCH_IMAGE_MAX_MB`, `STUDYBENCH_DOCUMENT_MAX_MB`, and per tool
    /// `STUDYBENCH_<TOOL>_MAX_CHARS` / `STUDYBENCH_<TOOL>_COST`.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = AttachmentCaps::default();
        let max_files = env_parse("STUDYBENCH_MAX_ATTACHMENTS", defaults.max_files);
        if max_files == 0 {
            return Err(anyhow::anyhow!("STUDYBENCH_MAX_ATTACHMENTS must be at least 1"));
        }

        let image_max_bytes = env_parse(
            "STUDYBENCH_IMAGE_MAX_MB",
            defaults.image_max_bytes / BYTES_PER_MB,
        ) * BYTES_PER_MB;
        let document_max_bytes = env_parse(
            "STUDYBENCH_DOCUMENT_MAX_MB",
            defaults.document_max_bytes / BYTES_PER_MB,
        ) * BYTES_PER_MB;
        if image_max_bytes == 0 || document_max_bytes == 0 {
            return Err(anyhow::anyhow!("attachment size caps must be at least 1 MB"));
        }

        Ok(Self {
            attachments: AttachmentCaps {
                max_files,
                image_max_bytes,
                document_max_bytes,
            },
            summarize: profile_from_env(ToolKind::Summarize),
            questions: profile_from_env(ToolKind::Questions),
            explain: profile_from_env(ToolKind::Explain),
            rewrite: profile_from_env(ToolKind::Rewrite),
        })
    }
}

fn profile_from_env(kind: ToolKind) -> ToolProfile {
    let default = ToolProfile::default_for(kind);
    let tool = kind.as_str().to_uppercase();
    ToolProfile {
        kind,
        max_input_chars: env_parse(
            &format!("STUDYBENCH_{tool}_MAX_CHARS"),
            default.max_input_chars,
        ),
        nominal_cost: env_parse(&format!("STUDYBENCH_{tool}_COST"), default.nominal_cost),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_caps_match_constants() {
        let caps = AttachmentCaps::default();
        assert_eq!(caps.max_files, 5);
        assert_eq!(caps.max_bytes_for(AttachmentKind::Image), 5 * 1024 * 1024);
        assert_eq!(caps.max_bytes_for(AttachmentKind::Pdf), 10 * 1024 * 1024);
        assert_eq!(caps.max_bytes_for(AttachmentKind::Other), 10 * 1024 * 1024);
    }

    #[test]
    fn profile_lookup_returns_matching_kind() {
        let config = EngineConfig::default();
        for kind in [
            ToolKind::Summarize,
            ToolKind::Questions,
            ToolKind::Explain,
            ToolKind::Rewrite,
        ] {
            assert_eq!(config.profile(kind).kind, kind);
        }
    }

    #[test]
    fn env_parse_ignores_garbage() {
        // Unset variables and bad values both fall back to the default.
        assert_eq!(env_parse("STUDYBENCH_TEST_UNSET_VARIABLE", 7_usize), 7);
    }
}
