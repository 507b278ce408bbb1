//! Transcript Extractor - layered transcript extraction for YouTube watch pages
//!
//! This library pulls a timestamped transcript out of a watch page without API
//! access. Four strategies of decreasing reliability are tried in order: the
//! page-context bridge, embedded page data, auto-caption re-chunking and the
//! rendered transcript panel. Results are cached and concurrent requests for
//! one video share a single extraction.

pub mod bridge;
pub mod captions;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod messaging;
pub mod output;
pub mod page;
pub mod service;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{CaptionFetcher, TranscriptLayer};
pub use messaging::{handle_request, TranscriptRequest, TranscriptResponse};
pub use page::{PageLoader, WatchPage};
pub use service::{LayerStack, TranscriptService};
pub use transcript::{ExtractionLayer, TranscriptMetadata, TranscriptResult, TranscriptSegment, TranscriptStatus};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the extractor
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("Missing video identifier")]
    MissingVideoId,

    #[error("Invalid video identifier or URL: {0}")]
    InvalidVideo(String),

    #[error("Watch page could not be loaded: {0}")]
    PageLoad(String),

    #[error("Caption fetch failed: {0}")]
    CaptionFetch(String),

    #[error("Caption decode failed: {0}")]
    Decode(String),
}
