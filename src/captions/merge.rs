use crate::transcript::TranscriptSegment;

/// Default silent gap closed by [`merge_adjacent`], in seconds
pub const DEFAULT_MAX_GAP: f64 = 0.1;

/// Default span reached by [`merge_word_segments`] before emitting, in seconds
pub const DEFAULT_MIN_DURATION: f64 = 0.5;

/// Fold temporally adjacent segments together.
///
/// A segment is appended to the one before it when the silence between them
/// is at most `max_gap` seconds; otherwise it starts a new segment.
pub fn merge_adjacent(segments: &[TranscriptSegment], max_gap: f64) -> Vec<TranscriptSegment> {
    let mut merged: Vec<TranscriptSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match merged.last_mut() {
            Some(current) if segment.start_time - current.end_time <= max_gap => {
                current.end_time = current.end_time.max(segment.end_time);
                append_text(current, segment);
            }
            _ => merged.push(segment.clone()),
        }
    }

    merged
}

/// Accumulate word-level segments until their span reaches `min_duration`.
///
/// Each full buffer becomes one segment; a trailing buffer shorter than the
/// minimum is still emitted as the final segment.
pub fn merge_word_segments(segments: &[TranscriptSegment], min_duration: f64) -> Vec<TranscriptSegment> {
    let mut merged = Vec::new();
    let mut buffer: Option<TranscriptSegment> = None;

    for segment in segments {
        match buffer.as_mut() {
            Some(current) => {
                current.end_time = current.end_time.max(segment.end_time);
                append_text(current, segment);
            }
            None => buffer = Some(segment.clone()),
        }

        let reached = buffer
            .as_ref()
            .is_some_and(|current| current.end_time - current.start_time >= min_duration);
        if reached {
            merged.extend(buffer.take());
        }
    }

    merged.extend(buffer);
    merged
}

fn append_text(into: &mut TranscriptSegment, next: &TranscriptSegment) {
    join_into(&mut into.raw_text, &next.raw_text);
    join_into(&mut into.cleaned_text, &next.cleaned_text);
}

fn join_into(target: &mut String, addition: &str) {
    if addition.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(addition);
}
