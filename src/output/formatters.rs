use anyhow::Result;
use std::fmt::Write;

use crate::transcript::{TranscriptResult, TranscriptSegment};
use crate::utils::format_timestamp;

/// Plain text, one line per segment, optionally prefixed with `[m:ss]`
pub fn format_as_text(segments: &[TranscriptSegment], include_timestamps: bool) -> String {
    segments
        .iter()
        .map(|s| {
            if include_timestamps {
                format!("[{}] {}", format_timestamp(s.start_time), s.cleaned_text)
            } else {
                s.cleaned_text.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The full result, segments restricted to `segments`
pub fn format_as_json(result: &TranscriptResult, segments: &[TranscriptSegment]) -> Result<String> {
    let view = TranscriptResult {
        segments: segments.to_vec(),
        ..result.clone()
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

pub fn format_as_srt(segments: &[TranscriptSegment]) -> Result<String> {
    let mut output = String::new();
    for (i, segment) in segments.iter().enumerate() {
        writeln!(output, "{}", i + 1)?;
        writeln!(
            output,
            "{} --> {}",
            clock_time(segment.start_time, ','),
            clock_time(segment.end_time, ',')
        )?;
        writeln!(output, "{}\n", segment.raw_text)?;
    }
    Ok(output)
}

pub fn format_as_vtt(segments: &[TranscriptSegment]) -> Result<String> {
    let mut output = String::from("WEBVTT\n\n");
    for segment in segments {
        writeln!(
            output,
            "{} --> {}",
            clock_time(segment.start_time, '.'),
            clock_time(segment.end_time, '.')
        )?;
        writeln!(output, "{}\n", segment.raw_text)?;
    }
    Ok(output)
}

/// `start,end,text` rows with seconds to millisecond precision
pub fn format_as_csv(segments: &[TranscriptSegment]) -> Result<String> {
    let mut output = String::from("start,end,text\n");
    for segment in segments {
        writeln!(
            output,
            "{:.3},{:.3},{}",
            segment.start_time,
            segment.end_time,
            csv_field(&segment.cleaned_text)
        )?;
    }
    Ok(output)
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// `HH:MM:SS<sep>mmm`
fn clock_time(seconds: f64, separator: char) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1000;
    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, ms % 1000)
}
