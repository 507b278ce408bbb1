use anyhow::Result;
use std::path::Path;

use crate::captions::merge_adjacent;
use crate::cli::OutputFormat;
use crate::transcript::{TranscriptResult, TranscriptSegment};

pub mod formatters;

pub use formatters::*;

/// How a result is rendered
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub timestamps: bool,
    /// Keep only segments overlapping `[from, to]`
    pub from: Option<f64>,
    pub to: Option<f64>,
    /// Close silent gaps up to this many seconds before rendering
    pub merge_gap: Option<f64>,
}

impl RenderOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            timestamps: false,
            from: None,
            to: None,
            merge_gap: None,
        }
    }

    fn select(&self, segments: &[TranscriptSegment]) -> Vec<TranscriptSegment> {
        let from = self.from.unwrap_or(0.0);
        let to = self.to.unwrap_or(f64::INFINITY);
        let in_range: Vec<TranscriptSegment> = segments
            .iter()
            .filter(|s| s.overlaps(from, to))
            .cloned()
            .collect();

        match self.merge_gap {
            Some(gap) => merge_adjacent(&in_range, gap),
            None => in_range,
        }
    }
}

/// Render `result` per `options`
pub fn render(result: &TranscriptResult, options: &RenderOptions) -> Result<String> {
    let segments = options.select(&result.segments);
    match options.format {
        OutputFormat::Text => Ok(format_as_text(&segments, options.timestamps)),
        OutputFormat::Json => format_as_json(result, &segments),
        OutputFormat::Srt => format_as_srt(&segments),
        OutputFormat::Vtt => format_as_vtt(&segments),
        OutputFormat::Csv => format_as_csv(&segments),
    }
}

/// Save transcript to file
pub async fn save_to_file(result: &TranscriptResult, path: &Path, options: &RenderOptions) -> Result<()> {
    let content = render(result, options)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(result: &TranscriptResult, options: &RenderOptions) -> Result<()> {
    let content = render(result, options)?;
    println!("{}", content);
    Ok(())
}
