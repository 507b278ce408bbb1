use async_trait::async_trait;
use futures_util::FutureExt;
use reqwest::Client;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub mod auto_captions;
pub mod bridge;
pub mod page_data;
pub mod panel;
pub mod tracks;

pub use auto_captions::AutoCaptionReprocessor;
pub use bridge::BridgeLayer;
pub use page_data::PageDataLayer;
pub use panel::PanelLayer;
pub use tracks::{caption_url, select_track, TrackSelection};

use crate::captions::{self, CaptionFormat};
use crate::config::ExtractionConfig;
use crate::page::{CaptionTrack, WatchPage};
use crate::transcript::{ExtractionLayer, TranscriptMetadata, TranscriptResult, TranscriptSegment};
use crate::{Result, TranscriptorError};

/// One strategy for producing a transcript from a page.
///
/// Implementations report every outcome through the returned status and
/// never fail past their own boundary.
#[async_trait]
pub trait TranscriptLayer: Send + Sync {
    fn layer(&self) -> ExtractionLayer;

    async fn extract(&self, page: &WatchPage) -> TranscriptResult;
}

/// Run one layer, turning a panic inside it into an ERROR result
pub async fn guarded<F>(layer: ExtractionLayer, extraction: F) -> TranscriptResult
where
    F: Future<Output = TranscriptResult>,
{
    match AssertUnwindSafe(extraction).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(%layer, "Layer panicked: {}", message);
            TranscriptResult::error(layer, format!("{} layer failed unexpectedly: {}", layer, message))
        }
    }
}

/// Fetches caption payloads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetches caption payloads over HTTP
pub struct HttpCaptionFetcher {
    client: Client,
}

impl HttpCaptionFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CaptionFetcher for HttpCaptionFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching caption payload: {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptorError::CaptionFetch(format!("HTTP {}", status)).into());
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(TranscriptorError::CaptionFetch("empty caption payload".to_string()).into());
        }
        Ok(body)
    }
}

/// Shared fetch-and-decode routine behind the metadata layers
pub struct CaptionDecoder {
    fetcher: Arc<dyn CaptionFetcher>,
    languages: Vec<String>,
    translate_to: Option<String>,
    format: Option<CaptionFormat>,
}

impl CaptionDecoder {
    pub fn new(fetcher: Arc<dyn CaptionFetcher>, config: &ExtractionConfig) -> Self {
        Self {
            fetcher,
            languages: config.preferred_languages.clone(),
            translate_to: config.translate_to.clone(),
            format: config.caption_format.requested(),
        }
    }

    /// Select a track among `tracks`, fetch it and decode it into a result
    /// attributed to `layer`
    pub async fn decode_tracks(&self, video_id: &str, tracks: &[CaptionTrack], layer: ExtractionLayer) -> TranscriptResult {
        if video_id.trim().is_empty() {
            return TranscriptResult::error(layer, TranscriptorError::MissingVideoId.to_string());
        }

        let Some(selection) = select_track(tracks, &self.languages, self.translate_to.as_deref()) else {
            return TranscriptResult::unavailable(layer, "No caption tracks found");
        };

        tracing::debug!(
            %layer,
            language = selection.language_code(),
            auto_generated = selection.track.is_auto_generated(),
            translated = selection.is_translation(),
            "Selected caption track"
        );

        match self.fetch_segments(&selection).await {
            Ok(segments) if segments.is_empty() => {
                TranscriptResult::unavailable(layer, "Caption track contained no text")
            }
            Ok(segments) => {
                let metadata = TranscriptMetadata::describe(
                    video_id,
                    selection.track.display_name(),
                    selection.language_code(),
                    selection.track.is_auto_generated(),
                    selection.is_translation(),
                    &segments,
                );
                TranscriptResult::ready(segments, metadata, layer)
            }
            Err(e) => {
                tracing::warn!(%layer, "Caption decode failed: {:#}", e);
                TranscriptResult::error(layer, format!("{:#}", e))
            }
        }
    }

    async fn fetch_segments(&self, selection: &TrackSelection) -> Result<Vec<TranscriptSegment>> {
        let url = caption_url(selection, self.format)?;
        let payload = self.fetcher.fetch(&url).await?;
        let segments = captions::decode(&payload, CaptionFormat::declared_by(&url))?;
        Ok(segments)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::transcript::TranscriptStatus;

    fn english_track() -> CaptionTrack {
        serde_json::from_str(
            r#"{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","languageCode":"en","name":{"simpleText":"English"}}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_decode_tracks_builds_ready_result() {
        let mut mock = MockCaptionFetcher::new();
        mock.expect_fetch()
            .withf(|url| url.contains("fmt=json3"))
            .times(1)
            .returning(|_| Ok(EVENT_PAYLOAD.to_string()));
        let decoder = decoder(Arc::new(mock));

        let result = decoder.decode_tracks("abc", &[english_track()], ExtractionLayer::PageBridge).await;
        assert_eq!(result.status, TranscriptStatus::Ready);
        assert_eq!(result.extraction_layer, Some(ExtractionLayer::PageBridge));
        assert_eq!(result.segments.len(), 3);
        let metadata = result.metadata.unwrap();
        assert_eq!(metadata.language.as_deref(), Some("English"));
        assert_eq!(metadata.segment_count, 3);
        assert!((metadata.duration - 3.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_video_id_is_an_error() {
        let decoder = decoder(fetcher_returning(EVENT_PAYLOAD));
        let result = decoder.decode_tracks("", &[english_track()], ExtractionLayer::PageData).await;
        assert_eq!(result.status, TranscriptStatus::Error);
    }

    #[tokio::test]
    async fn test_no_tracks_is_unavailable() {
        let decoder = decoder(fetcher_returning(EVENT_PAYLOAD));
        let result = decoder.decode_tracks("abc", &[], ExtractionLayer::PageData).await;
        assert_eq!(result.status, TranscriptStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_not_propagated() {
        let mut mock = MockCaptionFetcher::new();
        mock.expect_fetch()
            .returning(|_| Err(TranscriptorError::CaptionFetch("HTTP 429 Too Many Requests".to_string()).into()));
        let decoder = decoder(Arc::new(mock));

        let result = decoder.decode_tracks("abc", &[english_track()], ExtractionLayer::PageBridge).await;
        assert_eq!(result.status, TranscriptStatus::Error);
        assert!(result.error.unwrap().contains("429"));
    }

    async fn exploding_layer() -> TranscriptResult {
        panic!("selector engine exploded")
    }

    #[tokio::test]
    async fn test_guarded_converts_panics() {
        let result = guarded(ExtractionLayer::RenderedPanel, exploding_layer()).await;
        assert_eq!(result.status, TranscriptStatus::Error);
        assert!(result.error.unwrap().contains("selector engine exploded"));
    }
}
