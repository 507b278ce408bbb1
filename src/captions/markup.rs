//! Decoder for the `<transcript><text start=".." dur="..">` caption format.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::text;
use crate::transcript::TranscriptSegment;

static XML_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>").unwrap_or_else(|_| unreachable!()));

static TEXT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<text\b([^>]*)>").unwrap_or_else(|_| unreachable!()));

/// Where a unit's body ends: its own close tag or the next unit's open tag
static TEXT_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</text\s*>|<text\b").unwrap_or_else(|_| unreachable!()));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(start|dur)\s*=\s*["']([^"']*)["']"#).unwrap_or_else(|_| unreachable!())
});

/// Decode a markup caption payload.
///
/// The payload is parsed as a document first. When the parser reports
/// errors the whole payload is re-read with a permissive pattern scan so
/// one broken unit does not discard the rest.
pub fn decode(payload: &str) -> Vec<TranscriptSegment> {
    match decode_structured(payload) {
        Some(segments) => segments,
        None => {
            tracing::debug!("Markup payload is malformed, falling back to pattern extraction");
            decode_permissive(payload)
        }
    }
}

/// Structural parse; `None` when the document is malformed
pub fn decode_structured(payload: &str) -> Option<Vec<TranscriptSegment>> {
    let body = XML_DECLARATION.replace(payload, "");
    let fragment = Html::parse_fragment(&body);
    if !fragment.errors.is_empty() {
        tracing::trace!(errors = ?fragment.errors, "Markup parse errors");
        return None;
    }

    let selector = Selector::parse("text").ok()?;
    let mut segments = Vec::new();
    for element in fragment.select(&selector) {
        let attrs = element.value();
        let Some(start) = attrs.attr("start").and_then(parse_seconds) else {
            continue;
        };
        let dur = attrs.attr("dur").and_then(parse_seconds).unwrap_or(0.0);
        let inner: String = element.text().collect();
        if let Some(segment) = build(start, dur, &inner) {
            segments.push(segment);
        }
    }
    Some(super::order_segments(segments))
}

/// Pattern scan over the raw payload; never fails
pub fn decode_permissive(payload: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    for unit in TEXT_OPEN.captures_iter(payload) {
        let body_start = unit.get(0).map_or(payload.len(), |m| m.end());
        let body_end = TEXT_BOUNDARY
            .find_at(payload, body_start)
            .map_or(payload.len(), |m| m.start());
        let mut start = None;
        let mut dur = None;
        for attr in ATTRIBUTE.captures_iter(&unit[1]) {
            match &attr[1] {
                "start" => start = parse_seconds(&attr[2]),
                _ => dur = parse_seconds(&attr[2]),
            }
        }
        let Some(start) = start else { continue };
        if let Some(segment) = build(start, dur.unwrap_or(0.0), &payload[body_start..body_end]) {
            segments.push(segment);
        }
    }
    super::order_segments(segments)
}

fn build(start: f64, dur: f64, inner: &str) -> Option<TranscriptSegment> {
    let (raw, cleaned) = text::normalize(inner)?;
    Some(TranscriptSegment::new(start, start + dur.max(0.0), raw, cleaned))
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_unit() {
        let segments = decode(r#"<text start="0.5" dur="2.3">Hello world</text>"#);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 0.5);
        assert!((segments[0].end_time - 2.8).abs() < 1e-9);
        assert_eq!(segments[0].cleaned_text, "Hello world");
    }

    #[test]
    fn test_malformed_payload_falls_back_to_patterns() {
        let payload = r#"<transcript><text start="0.5" dur="2.3">Hello world</text><text start="9"#;
        assert!(decode_structured(payload).is_none());

        let segments = decode(payload);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 0.5);
        assert!((segments[0].end_time - 2.8).abs() < 1e-9);
        assert_eq!(segments[0].cleaned_text, "Hello world");
    }

    #[test]
    fn test_unclosed_unit_keeps_the_next_boundary() {
        let segments = decode_permissive(r#"<text start="1" dur="1">a<text start="2" dur="1">b</text>"#);
        let units: Vec<(f64, &str)> = segments.iter().map(|s| (s.start_time, s.cleaned_text.as_str())).collect();
        assert_eq!(units, vec![(1.0, "a"), (2.0, "b")]);
    }

    #[test]
    fn test_full_document_with_declaration_and_entities() {
        let payload = concat!(
            r#"<?xml version="1.0" encoding="utf-8" ?><transcript>"#,
            r#"<text start="3.2" dur="1.0">second</text>"#,
            r#"<text start="1.0" dur="2.0">it&amp;#39;s first</text>"#,
            r#"<text start="4.2" dur="1.0">   </text>"#,
            r#"<text start="5.0">no duration</text>"#,
            "</transcript>"
        );
        let segments = decode(payload);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].cleaned_text, "it's first");
        assert_eq!(segments[1].start_time, 3.2);
        assert_eq!(segments[2].end_time, 5.0);
    }
}
