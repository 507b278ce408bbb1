use crate::captions::merge_word_segments;
use crate::transcript::{ExtractionLayer, TranscriptMetadata, TranscriptResult, TranscriptStatus};

/// Layer C: re-chunks word-level auto-generated captions into phrases
#[derive(Debug, Clone)]
pub struct AutoCaptionReprocessor {
    min_duration: f64,
}

impl AutoCaptionReprocessor {
    pub fn new(min_duration: f64) -> Self {
        Self { min_duration }
    }

    /// Whether `result` came from an auto-generated track and has segments to merge
    pub fn applies_to(&self, result: &TranscriptResult) -> bool {
        matches!(result.status, TranscriptStatus::Ready | TranscriptStatus::Partial)
            && !result.segments.is_empty()
            && result.metadata.as_ref().is_some_and(|m| m.is_auto_generated)
    }

    /// Merge the segments of `result`; anything it does not apply to passes through
    pub fn reprocess(&self, result: TranscriptResult) -> TranscriptResult {
        if !self.applies_to(&result) {
            return result;
        }

        let before = result.segments.len();
        let segments = merge_word_segments(&result.segments, self.min_duration);
        tracing::debug!(before, after = segments.len(), "Re-chunked auto-generated captions");

        let metadata = result.metadata.map(|m| TranscriptMetadata {
            segment_count: segments.len(),
            ..m
        });

        TranscriptResult {
            segments,
            metadata,
            extraction_layer: Some(ExtractionLayer::AutoCaption),
            ..result
        }
    }
}

impl Default for AutoCaptionReprocessor {
    fn default() -> Self {
        Self::new(crate::captions::merge::DEFAULT_MIN_DURATION)
    }
}
