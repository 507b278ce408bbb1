use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcriptor",
    about = "Transcript Extractor - Pull timestamped transcripts out of YouTube watch pages",
    version,
    long_about = "Extracts a timestamped transcript from a YouTube watch page without API access. Tries the page's player data first, then recovers caption tracks from embedded scripts, re-chunks auto-generated captions, and finally scrapes the rendered transcript panel."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the transcript of a video
    Extract {
        /// Video id or watch / youtu.be / embed / shorts / live URL
        #[arg(value_name = "VIDEO_OR_URL")]
        video: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Include [m:ss] timestamps in text output
        #[arg(long)]
        timestamps: bool,

        /// Only output segments from this time (seconds or m:ss)
        #[arg(long, value_name = "TIME", value_parser = parse_time)]
        from: Option<f64>,

        /// Only output segments up to this time (seconds or m:ss)
        #[arg(long, value_name = "TIME", value_parser = parse_time)]
        to: Option<f64>,

        /// Merge segments separated by at most this many seconds of silence
        #[arg(long, value_name = "SECONDS")]
        merge_gap: Option<f64>,

        /// Preferred caption language, repeatable (overrides the configuration)
        #[arg(short, long = "language", value_name = "LANG")]
        languages: Vec<String>,
    },

    /// Answer one JSON request, e.g. {"type":"GET_TRANSCRIPT_STATUS","videoId":"..."}
    Request {
        #[arg(value_name = "JSON")]
        json: String,
    },

    /// Show or locate the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List extraction layers in priority order
    Layers,
}

fn parse_time(value: &str) -> Result<f64, String> {
    crate::utils::parse_timestamp(value).ok_or_else(|| format!("invalid time: {}", value))
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with status and metadata
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_arguments() {
        let cli = Cli::parse_from([
            "transcriptor", "extract", "dQw4w9WgXcQ", "-f", "srt", "--from", "1:30", "-l", "de", "-l", "en",
        ]);
        match cli.command {
            Commands::Extract { video, format, from, languages, .. } => {
                assert_eq!(video, "dQw4w9WgXcQ");
                assert_eq!(format, Some(OutputFormat::Srt));
                assert_eq!(from, Some(90.0));
                assert_eq!(languages, vec!["de".to_string(), "en".to_string()]);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_output_format_from_config_string() {
        assert_eq!("VTT".parse::<OutputFormat>(), Ok(OutputFormat::Vtt));
        assert!("docx".parse::<OutputFormat>().is_err());
    }
}
