//! Decoder for the JSON event-list caption format (`fmt=json3`).

use serde::Deserialize;

use super::text;
use crate::transcript::TranscriptSegment;
use crate::TranscriptorError;

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<CaptionEvent>,
}

#[derive(Debug, Deserialize)]
struct CaptionEvent {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<f64>,
    #[serde(rename = "dDurationMs")]
    d_duration_ms: Option<f64>,
    segs: Option<Vec<Fragment>>,
}

#[derive(Debug, Deserialize)]
struct Fragment {
    #[serde(default)]
    utf8: String,
}

/// Decode an event-list payload; only an unparseable document is an error
pub fn decode(payload: &str) -> Result<Vec<TranscriptSegment>, TranscriptorError> {
    let list: EventList = serde_json::from_str(payload)
        .map_err(|e| TranscriptorError::Decode(format!("invalid event-list payload: {}", e)))?;

    let segments: Vec<TranscriptSegment> = list
        .events
        .into_iter()
        .filter_map(|event| {
            let start_ms = event.t_start_ms?;
            let fragments = event.segs?;
            let joined: String = fragments.iter().map(|f| f.utf8.as_str()).collect();
            let (raw, cleaned) = text::normalize(&joined)?;
            let start = start_ms / 1000.0;
            let duration = event.d_duration_ms.unwrap_or(0.0).max(0.0) / 1000.0;
            Some(TranscriptSegment::new(start, start + duration, raw, cleaned))
        })
        .collect();

    Ok(super::order_segments(segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let payload = r#"{"events":[{"tStartMs":500,"dDurationMs":2300,"segs":[{"utf8":"Hello world"}]}]}"#;
        let segments = decode(payload).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 0.5);
        assert!((segments[0].end_time - 2.8).abs() < 1e-9);
        assert_eq!(segments[0].cleaned_text, "Hello world");
    }

    #[test]
    fn test_fragments_are_concatenated_and_gaps_skipped() {
        let payload = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 4000, "id": 1, "wpWinPosId": 1},
                {"tStartMs": 1000, "dDurationMs": 1500, "segs": [{"utf8": "so"}, {"utf8": " we", "tOffsetMs": 300}, {"utf8": " begin"}]},
                {"tStartMs": 2500, "dDurationMs": 10, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"dDurationMs": 500, "segs": [{"utf8": "orphan"}]}
            ]
        }"#;
        let segments = decode(payload).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].raw_text, "so we begin");
        assert_eq!(segments[0].end_time, 2.5);
    }

    #[test]
    fn test_overlapping_events_end_at_next_start() {
        let payload = r#"{"events":[
            {"tStartMs":0,"dDurationMs":4000,"segs":[{"utf8":"rolling"}]},
            {"tStartMs":1500,"dDurationMs":3000,"segs":[{"utf8":"captions"}]}
        ]}"#;
        let segments = decode(payload).unwrap();
        assert_eq!(segments[0].end_time, 1.5);
        assert_eq!(segments[1].end_time, 4.5);
    }

    #[test]
    fn test_invalid_json_is_a_decode_error() {
        assert!(matches!(decode("<transcript/>"), Err(TranscriptorError::Decode(_))));
    }
}
