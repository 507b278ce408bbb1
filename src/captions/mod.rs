//! Caption payload decoders and segment post-processing.

use serde::{Deserialize, Serialize};
use url::Url;

pub mod events;
pub mod markup;
pub mod merge;
pub mod text;

pub use merge::{merge_adjacent, merge_word_segments, DEFAULT_MAX_GAP, DEFAULT_MIN_DURATION};

use crate::transcript::TranscriptSegment;
use crate::TranscriptorError;

/// Wire formats a caption payload can arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionFormat {
    /// `<text start=".." dur="..">` units
    Markup,
    /// `{"events": [...]}` with millisecond offsets
    EventList,
}

impl CaptionFormat {
    /// Value of the `fmt` query parameter requesting this format
    pub fn query_value(&self) -> &'static str {
        match self {
            CaptionFormat::Markup => "srv1",
            CaptionFormat::EventList => "json3",
        }
    }

    /// Format declared by a caption URL's `fmt` parameter, if recognizable
    pub fn declared_by(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let fmt = parsed
            .query_pairs()
            .find(|(key, _)| key == "fmt")
            .map(|(_, value)| value.into_owned())?;
        match fmt.as_str() {
            "json3" => Some(CaptionFormat::EventList),
            "srv1" | "xml" => Some(CaptionFormat::Markup),
            _ => None,
        }
    }

    /// Guess the format from the payload itself
    pub fn sniff(payload: &str) -> Self {
        if payload.trim_start().starts_with('{') {
            CaptionFormat::EventList
        } else {
            CaptionFormat::Markup
        }
    }
}

/// Decode a payload, trusting `declared` when given and sniffing otherwise
pub fn decode(payload: &str, declared: Option<CaptionFormat>) -> Result<Vec<TranscriptSegment>, TranscriptorError> {
    let format = declared.unwrap_or_else(|| CaptionFormat::sniff(payload));
    tracing::debug!(?format, bytes = payload.len(), "Decoding caption payload");
    match format {
        CaptionFormat::EventList => events::decode(payload),
        CaptionFormat::Markup => Ok(markup::decode(payload)),
    }
}

/// Sort by start time and trim any end past the next segment's start
pub fn order_segments(mut segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    for i in 1..segments.len() {
        let next_start = segments[i].start_time;
        let previous = &mut segments[i - 1];
        if previous.end_time > next_start {
            previous.end_time = next_start.max(previous.start_time);
        }
    }
    segments
}
