use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File category, derived from the MIME type with a filename-extension
/// fallback. Decides which extraction endpoint handles the file and which
/// size cap applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Pdf,
    Doc,
    Text,
    Other,
}

impl AttachmentKind {
    pub fn detect(mime_type: &str, filename: &str) -> Self {
        let mime = mime_type.trim().to_lowercase();
        if mime.starts_with("image/") {
            return Self::Image;
        }
        if mime == "application/pdf" {
            return Self::Pdf;
        }
        if mime.contains("msword") || mime.contains("wordprocessingml") {
            return Self::Doc;
        }
        if mime.starts_with("text/") {
            return Self::Text;
        }

        // Missing or generic MIME type: fall back to the extension.
        let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" => Self::Image,
            "pdf" => Self::Pdf,
            "doc" | "docx" | "odt" | "rtf" => Self::Doc,
            "txt" | "md" | "markdown" | "csv" => Self::Text,
            _ => Self::Other,
        }
    }

    /// Whether extraction goes through the image OCR endpoint.
    pub fn uses_ocr(&self) -> bool {
        matches!(self, Self::Image)
    }
}

/// Extraction lifecycle of a single attachment.
///
/// Transitions `Pending → Extracting → {Extracted | Failed}` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    Pending,
    Extracting,
    Extracted(String),
    Failed(String),
}

impl ExtractionState {
    /// True once extraction reached a terminal state.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Extracted(_) | Self::Failed(_))
    }

    /// Extracted text, if extraction succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Extracted(text) => Some(text),
            _ => None,
        }
    }
}

/// A user-supplied file tracked through its extraction lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub kind: AttachmentKind,
    pub size_bytes: u64,
    pub original_name: String,
    pub state: ExtractionState,
}

/// Raw user-selected file handed to the attachment set.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_prefers_mime_type() {
        assert_eq!(
            AttachmentKind::detect("image/png", "notes.pdf"),
            AttachmentKind::Image
        );
        assert_eq!(
            AttachmentKind::detect("application/pdf", "scan.png"),
            AttachmentKind::Pdf
        );
        assert_eq!(
            AttachmentKind::detect(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "essay"
            ),
            AttachmentKind::Doc
        );
        assert_eq!(
            AttachmentKind::detect("text/plain", "anything.bin"),
            AttachmentKind::Text
        );
    }

    #[test]
    fn detect_falls_back_to_extension() {
        assert_eq!(
            AttachmentKind::detect("application/octet-stream", "photo.JPG"),
            AttachmentKind::Image
        );
        assert_eq!(
            AttachmentKind::detect("", "paper.docx"),
            AttachmentKind::Doc
        );
        assert_eq!(AttachmentKind::detect("", "notes.md"), AttachmentKind::Text);
        assert_eq!(
            AttachmentKind::detect("application/octet-stream", "blob"),
            AttachmentKind::Other
        );
    }

    #[test]
    fn extraction_state_accessors() {
        assert!(!ExtractionState::Extracting.is_settled());
        assert!(ExtractionState::Failed("ocr error".into()).is_settled());
        assert_eq!(
            ExtractionState::Extracted("hello".into()).text(),
            Some("hello")
        );
        assert_eq!(ExtractionState::Pending.text(), None);
    }
}
