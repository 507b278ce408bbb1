use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_extractor::cli::{Cli, Commands, OutputFormat};
use transcript_extractor::config::Config;
use transcript_extractor::messaging::{handle_request, TranscriptRequest};
use transcript_extractor::output::{self, RenderOptions};
use transcript_extractor::service::TranscriptService;
use transcript_extractor::transcript::ExtractionLayer;
use transcript_extractor::utils::{extract_video_id, format_duration};
use transcript_extractor::TranscriptorError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "transcript_extractor=debug" } else { "transcript_extractor=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Extract {
            video,
            output,
            format,
            timestamps,
            from,
            to,
            merge_gap,
            languages,
        } => {
            let video_id = extract_video_id(&video).ok_or_else(|| TranscriptorError::InvalidVideo(video.clone()))?;

            let mut config = Config::load().await?;
            if !languages.is_empty() {
                config.extraction.preferred_languages = languages;
            }
            let format = match format {
                Some(format) => format,
                None => config
                    .app
                    .default_output_format
                    .parse::<OutputFormat>()
                    .map_err(|e| anyhow::anyhow!("Invalid default output format: {}", e))?,
            };

            let service = TranscriptService::from_config(&config)?;
            tracing::info!("Starting extraction for video: {}", video_id);

            let progress = (!cli.quiet).then(|| {
                let progress = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
                    progress.set_style(style);
                }
                progress.set_message(format!("Extracting transcript for {}...", video_id));
                progress.enable_steady_tick(Duration::from_millis(100));
                progress
            });

            let result = service.extract_transcript(&video_id).await;

            if let Some(progress) = progress {
                progress.finish_and_clear();
            }

            if !result.status.is_success() {
                anyhow::bail!(
                    "No transcript for {} ({}): {}",
                    video_id,
                    result.status,
                    result.error.as_deref().unwrap_or("unknown reason")
                );
            }

            if let Some(metadata) = &result.metadata {
                tracing::info!(
                    layer = ?result.extraction_layer,
                    language = %metadata.language_code,
                    segments = metadata.segment_count,
                    "Transcript covers {}",
                    format_duration(metadata.duration)
                );
            }

            let options = RenderOptions {
                format,
                timestamps,
                from,
                to,
                merge_gap,
            };
            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &options).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &options)?;
                }
            }
        }
        Commands::Request { json } => {
            let request: TranscriptRequest = serde_json::from_str(&json)?;
            let config = Config::load().await?;
            let service = TranscriptService::from_config(&config)?;
            let response = handle_request(&service, request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
            }
        }
        Commands::Layers => {
            println!("Extraction layers, in priority order:");
            for (i, layer) in ExtractionLayer::PRIORITY.iter().enumerate() {
                println!("  {}. {:<15} {}", i + 1, layer.as_str(), layer.description());
            }
        }
    }

    Ok(())
}
