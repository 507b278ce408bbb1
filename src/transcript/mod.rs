use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a transcript request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscriptStatus {
    /// Never requested
    Idle,
    /// Extraction in flight
    Loading,
    /// Full transcript available
    Ready,
    /// Some segments, incomplete confidence
    Partial,
    /// Searched and confirmed absent
    Unavailable,
    /// Unexpected failure, safe to retry
    Error,
}

impl TranscriptStatus {
    /// Whether a result with this status carries a usable transcript
    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptStatus::Ready | TranscriptStatus::Partial)
    }
}

impl fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TranscriptStatus::Idle => "IDLE",
            TranscriptStatus::Loading => "LOADING",
            TranscriptStatus::Ready => "READY",
            TranscriptStatus::Partial => "PARTIAL",
            TranscriptStatus::Unavailable => "UNAVAILABLE",
            TranscriptStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Which extraction layer produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionLayer {
    /// Layer A: caption tracks relayed by the page-context bridge
    PageBridge,
    /// Layer B: caption tracks recovered from embedded page data
    PageData,
    /// Layer C: auto-generated captions re-chunked into sentences
    AutoCaption,
    /// Layer D: rows scraped from the rendered transcript panel
    RenderedPanel,
    /// The orchestrator itself (page load failures, exhausted layers)
    Orchestrator,
}

impl ExtractionLayer {
    /// All layers in priority order
    pub const PRIORITY: [ExtractionLayer; 4] = [
        ExtractionLayer::PageBridge,
        ExtractionLayer::PageData,
        ExtractionLayer::AutoCaption,
        ExtractionLayer::RenderedPanel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionLayer::PageBridge => "page-bridge",
            ExtractionLayer::PageData => "page-data",
            ExtractionLayer::AutoCaption => "auto-caption",
            ExtractionLayer::RenderedPanel => "rendered-panel",
            ExtractionLayer::Orchestrator => "orchestrator",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExtractionLayer::PageBridge => "caption tracks relayed from the page's own script context",
            ExtractionLayer::PageData => "caption tracks recovered from embedded script/markup probes",
            ExtractionLayer::AutoCaption => "auto-generated tracks re-chunked into sentence-level segments",
            ExtractionLayer::RenderedPanel => "rows scraped from the rendered transcript panel (estimated end times)",
            ExtractionLayer::Orchestrator => "service-level outcome",
        }
    }
}

impl fmt::Display for ExtractionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One spoken unit with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start_time: f64,

    /// End time in seconds, never before `start_time`
    pub end_time: f64,

    /// Lightly normalized original text, safe for display
    pub raw_text: String,

    /// Whitespace/artifact-normalized text used for search
    pub cleaned_text: String,
}

impl TranscriptSegment {
    pub fn new(start_time: f64, end_time: f64, raw_text: impl Into<String>, cleaned_text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time: end_time.max(start_time),
            raw_text: raw_text.into(),
            cleaned_text: cleaned_text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whether this segment overlaps the closed interval `[start, end]`
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_time <= end && self.end_time >= start
    }
}

/// Provenance of one successful extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    pub video_id: String,

    /// Human-readable language name, when the source names one
    pub language: Option<String>,

    pub language_code: String,

    pub is_auto_generated: bool,

    pub is_translation: bool,

    pub extracted_at: chrono::DateTime<chrono::Utc>,

    /// Seconds, taken from the last segment's end
    pub duration: f64,

    pub segment_count: usize,
}

impl TranscriptMetadata {
    /// Describe a finished segment sequence
    pub fn describe(
        video_id: &str,
        language: Option<String>,
        language_code: &str,
        is_auto_generated: bool,
        is_translation: bool,
        segments: &[TranscriptSegment],
    ) -> Self {
        Self {
            video_id: video_id.to_string(),
            language,
            language_code: language_code.to_string(),
            is_auto_generated,
            is_translation,
            extracted_at: chrono::Utc::now(),
            duration: segments.last().map(|s| s.end_time).unwrap_or(0.0),
            segment_count: segments.len(),
        }
    }
}

/// The unit returned by every layer and by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub status: TranscriptStatus,

    pub segments: Vec<TranscriptSegment>,

    /// Present only for READY/PARTIAL
    pub metadata: Option<TranscriptMetadata>,

    /// Present on ERROR/UNAVAILABLE
    pub error: Option<String>,

    pub extraction_layer: Option<ExtractionLayer>,
}

impl TranscriptResult {
    pub fn idle() -> Self {
        Self::bare(TranscriptStatus::Idle, None, None)
    }

    pub fn loading() -> Self {
        Self::bare(TranscriptStatus::Loading, None, None)
    }

    pub fn ready(segments: Vec<TranscriptSegment>, metadata: TranscriptMetadata, layer: ExtractionLayer) -> Self {
        Self {
            status: TranscriptStatus::Ready,
            segments,
            metadata: Some(metadata),
            error: None,
            extraction_layer: Some(layer),
        }
    }

    pub fn partial(segments: Vec<TranscriptSegment>, metadata: TranscriptMetadata, layer: ExtractionLayer) -> Self {
        Self {
            status: TranscriptStatus::Partial,
            ..Self::ready(segments, metadata, layer)
        }
    }

    pub fn unavailable(layer: ExtractionLayer, reason: impl Into<String>) -> Self {
        Self::bare(TranscriptStatus::Unavailable, Some(layer), Some(reason.into()))
    }

    pub fn error(layer: ExtractionLayer, reason: impl Into<String>) -> Self {
        Self::bare(TranscriptStatus::Error, Some(layer), Some(reason.into()))
    }

    fn bare(status: TranscriptStatus, layer: Option<ExtractionLayer>, error: Option<String>) -> Self {
        Self {
            status,
            segments: Vec::new(),
            metadata: None,
            error,
            extraction_layer: layer,
        }
    }

    /// Whether the service should cache this result
    pub fn is_cacheable(&self) -> bool {
        self.status.is_success()
    }

    /// Cleaned text of every segment joined with single spaces
    pub fn full_text(&self) -> String {
        join_text(&self.segments)
    }
}

/// Join the cleaned text of segments with single spaces
pub fn join_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.cleaned_text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
