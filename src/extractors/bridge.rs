use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{CaptionDecoder, TranscriptLayer};
use crate::page::WatchPage;
use crate::transcript::{ExtractionLayer, TranscriptResult};
use crate::TranscriptorError;

/// Layer A: caption tracks relayed by the page-context bridge
pub struct BridgeLayer {
    decoder: Arc<CaptionDecoder>,
    timeout: Duration,
    poll_interval: Duration,
}

impl BridgeLayer {
    pub fn new(decoder: Arc<CaptionDecoder>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            decoder,
            timeout,
            poll_interval,
        }
    }
}

#[async_trait]
impl TranscriptLayer for BridgeLayer {
    fn layer(&self) -> ExtractionLayer {
        ExtractionLayer::PageBridge
    }

    async fn extract(&self, page: &WatchPage) -> TranscriptResult {
        let layer = self.layer();
        let video_id = page.video_id();
        if video_id.trim().is_empty() {
            return TranscriptResult::error(layer, TranscriptorError::MissingVideoId.to_string());
        }

        let Some(message) = page.bridge().request_tracks(self.timeout, self.poll_interval).await else {
            return TranscriptResult::unavailable(
                layer,
                format!("Page-context bridge did not respond within {} ms", self.timeout.as_millis()),
            );
        };

        if let Some(reason) = message.error {
            return TranscriptResult::unavailable(layer, reason);
        }

        if let Some(relayed) = message.video_id.as_deref().filter(|id| *id != video_id) {
            tracing::debug!(relayed, requested = video_id, "Bridge data belongs to another video");
            return TranscriptResult::unavailable(layer, format!("Bridge data is stale (page reports video {})", relayed));
        }

        tracing::debug!(tracks = message.caption_tracks.len(), "Bridge relayed caption tracks");
        self.decoder.decode_tracks(video_id, &message.caption_tracks, layer).await
    }
}
