//! Bounded attachment collection with asynchronous text extraction.
//!
//! Each added file is dispatched to the [`TextExtractor`] on its own tokio
//! task; completions arrive in any order and update only their own
//! attachment. Removing an attachment while extraction is in flight simply
//! discards the eventual result.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use studybench_core::config::AttachmentCaps;
use studybench_core::constants::PARAGRAPH_SEPARATOR;
use studybench_core::models::{Attachment, AttachmentKind, ExtractionState, SourceFile};
use studybench_core::{TextExtractor, ToolError};

/// Locally-held preview resource (e.g. a thumbnail handle) owned by one
/// attachment. Released exactly once; releasing twice is a no-op.
pub struct PreviewHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl PreviewHandle {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}

struct AttachmentEntry {
    attachment: Attachment,
    preview: Option<PreviewHandle>,
}

/// Bounded collection of attachments and their extraction lifecycle.
///
/// Cloning yields another handle to the same set; the extraction tasks hold
/// one while they run.
#[derive(Clone)]
pub struct AttachmentSet {
    extractor: Arc<dyn TextExtractor>,
    entries: Arc<Mutex<Vec<AttachmentEntry>>>,
    caps: AttachmentCaps,
}

impl AttachmentSet {
    pub fn new(extractor: Arc<dyn TextExtractor>, caps: AttachmentCaps) -> Self {
        Self {
            extractor,
            entries: Arc::new(Mutex::new(Vec::new())),
            caps,
        }
    }

    /// Add a file and start its extraction without blocking the caller.
    ///
    /// Rejects with `AttachmentLimitExceeded` when the set is full (the
    /// file is not queued) and with `AttachmentTooLarge` when the file
    /// exceeds its kind-specific cap.
    pub fn add(
        &self,
        file: SourceFile,
        preview: Option<PreviewHandle>,
    ) -> Result<Uuid, ToolError> {
        let kind = AttachmentKind::detect(&file.mime_type, &file.name);
        let size_bytes = file.data.len() as u64;
        let max_bytes = self.caps.max_bytes_for(kind);
        if size_bytes > max_bytes {
            return Err(ToolError::AttachmentTooLarge {
                name: file.name,
                size_bytes,
                max_bytes,
            });
        }

        let id = Uuid::new_v4();
        {
            let mut entries = self.entries.lock().unwrap();
            if entries.len() >= self.caps.max_files {
                return Err(ToolError::AttachmentLimitExceeded {
                    max: self.caps.max_files,
                });
            }
            entries.push(AttachmentEntry {
                attachment: Attachment {
                    id,
                    kind,
                    size_bytes,
                    original_name: file.name.clone(),
                    state: ExtractionState::Pending,
                },
                preview,
            });
            // Dispatch happens right below; the attachment never stays
            // observable in Pending.
            if let Some(entry) = entries.last_mut() {
                entry.attachment.state = ExtractionState::Extracting;
            }
        }

        tracing::debug!(
            attachment_id = %id,
            kind = ?kind,
            size_bytes,
            "Attachment added, extraction dispatched"
        );

        let set = self.clone();
        tokio::spawn(async move {
            let outcome = if kind.uses_ocr() {
                set.extractor.extract_from_image(&file).await
            } else {
                set.extractor.extract_from_document(&file).await
            };
            set.finish_extraction(id, outcome);
        });

        Ok(id)
    }

    fn finish_extraction(&self, id: Uuid, outcome: anyhow::Result<String>) {
        let mut entries = self.entries.lock().unwrap();
        // The attachment may have been removed while extraction was in
        // flight; its result is discarded.
        let Some(entry) = entries.iter_mut().find(|e| e.attachment.id == id) else {
            tracing::debug!(attachment_id = %id, "Extraction finished for removed attachment, discarding");
            return;
        };
        match outcome {
            Ok(text) => {
                tracing::debug!(attachment_id = %id, chars = text.chars().count(), "Attachment extracted");
                entry.attachment.state = ExtractionState::Extracted(text);
            }
            Err(err) => {
                tracing::warn!(attachment_id = %id, error = %err, "Attachment extraction failed");
                entry.attachment.state = ExtractionState::Failed(err.to_string());
            }
        }
    }

    /// Remove an attachment, releasing its preview resource synchronously.
    pub fn remove(&self, id: Uuid) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(pos) = entries.iter().position(|e| e.attachment.id == id) {
            let mut entry = entries.remove(pos);
            if let Some(preview) = entry.preview.as_mut() {
                preview.release();
            }
        }
    }

    /// True while at least one attachment has not settled.
    pub fn any_pending(&self) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|e| !e.attachment.state.is_settled())
    }

    /// Joined text of all successfully extracted attachments, in insertion
    /// order, blank-line separated. Failed attachments are skipped.
    pub fn combined_extracted_text(&self) -> String {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.attachment.state.text())
            .collect::<Vec<_>>()
            .join(PARAGRAPH_SEPARATOR)
    }

    /// Names of attachments whose extraction failed.
    pub fn failed_names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e.attachment.state, ExtractionState::Failed(_)))
            .map(|e| e.attachment.original_name.clone())
            .collect()
    }

    /// Drop all attachments, releasing their preview resources.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            if let Some(preview) = entry.preview.as_mut() {
                preview.release();
            }
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of the attachments for rendering.
    pub fn snapshot(&self) -> Vec<Attachment> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.attachment.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::testing::MockExtractor;

    fn file(name: &str, mime: &str, bytes: usize) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            mime_type: mime.to_string(),
            data: Bytes::from(vec![0u8; bytes]),
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn add_rejects_oversized_files() {
        let set = AttachmentSet::new(Arc::new(MockExtractor::new()), AttachmentCaps::default());

        let err = set
            .add(file("big.png", "image/png", 6 * 1024 * 1024), None)
            .unwrap_err();
        assert!(matches!(err, ToolError::AttachmentTooLarge { .. }));

        // Documents get the larger cap: the same size is fine for a pdf.
        set.add(file("big.pdf", "application/pdf", 6 * 1024 * 1024), None)
            .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn add_rejects_sixth_attachment() {
        let set = AttachmentSet::new(Arc::new(MockExtractor::new()), AttachmentCaps::default());
        for i in 0..5 {
            set.add(file(&format!("n{i}.txt"), "text/plain", 10), None)
                .unwrap();
        }
        let err = set.add(file("n5.txt", "text/plain", 10), None).unwrap_err();
        assert_eq!(err, ToolError::AttachmentLimitExceeded { max: 5 });
        assert_eq!(set.len(), 5);
    }

    #[tokio::test]
    async fn extraction_updates_only_its_own_attachment() {
        let extractor = Arc::new(MockExtractor::new());
        extractor.script("a.txt", Ok("alpha".to_string()));
        extractor.script("b.txt", Err("parse error".to_string()));
        let set = AttachmentSet::new(extractor, AttachmentCaps::default());

        set.add(file("a.txt", "text/plain", 10), None).unwrap();
        set.add(file("b.txt", "text/plain", 10), None).unwrap();
        settle().await;

        assert!(!set.any_pending());
        assert_eq!(set.combined_extracted_text(), "alpha");
        assert_eq!(set.failed_names(), vec!["b.txt".to_string()]);
    }

    #[tokio::test]
    async fn combined_text_preserves_insertion_order() {
        let extractor = Arc::new(MockExtractor::new());
        extractor.script("one.txt", Ok("first".to_string()));
        extractor.script("two.txt", Ok("second".to_string()));
        let set = AttachmentSet::new(extractor, AttachmentCaps::default());

        set.add(file("one.txt", "text/plain", 10), None).unwrap();
        set.add(file("two.txt", "text/plain", 10), None).unwrap();
        settle().await;

        assert_eq!(set.combined_extracted_text(), "first\n\nsecond");
    }

    #[tokio::test(start_paused = true)]
    async fn removing_mid_extraction_discards_result() {
        let extractor = Arc::new(MockExtractor::with_delay(Duration::from_secs(5)));
        extractor.script("slow.txt", Ok("late".to_string()));
        let set = AttachmentSet::new(extractor, AttachmentCaps::default());

        let id = set.add(file("slow.txt", "text/plain", 10), None).unwrap();
        settle().await;
        assert!(set.any_pending());

        set.remove(id);
        assert!(set.is_empty());

        tokio::time::advance(Duration::from_secs(6)).await;
        settle().await;
        // The late completion found nothing to update.
        assert!(set.is_empty());
        assert_eq!(set.combined_extracted_text(), "");
    }

    #[tokio::test]
    async fn preview_released_exactly_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let set = AttachmentSet::new(Arc::new(MockExtractor::new()), AttachmentCaps::default());

        let counter = Arc::clone(&released);
        set.add(
            file("img.png", "image/png", 10),
            Some(PreviewHandle::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();
        settle().await;

        set.clear();
        set.clear();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
