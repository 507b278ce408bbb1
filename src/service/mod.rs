//! The orchestrating service.
//!
//! Owns the result cache and the in-flight table, and runs the extraction
//! layers in priority order. Callers always get a [`TranscriptResult`];
//! nothing fails past this boundary.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::Config;
use crate::extractors::{
    guarded, AutoCaptionReprocessor, BridgeLayer, CaptionDecoder, HttpCaptionFetcher, PageDataLayer, PanelLayer,
    TranscriptLayer,
};
use crate::page::{build_client, HttpPageLoader, PageLoader, WatchPage};
use crate::transcript::{
    join_text, ExtractionLayer, TranscriptResult, TranscriptSegment, TranscriptStatus,
};
use crate::utils::format_timestamp;
use crate::{Result, TranscriptorError};

/// Default time-to-live of a cached result
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

type SharedExtraction = Shared<BoxFuture<'static, Arc<TranscriptResult>>>;

struct CacheEntry {
    result: Arc<TranscriptResult>,
    stored_at: Instant,
}

struct PendingExtraction {
    id: Uuid,
    extraction: SharedExtraction,
}

#[derive(Default)]
struct State {
    cache: HashMap<String, CacheEntry>,
    pending: HashMap<String, PendingExtraction>,
    /// Bumped by `reset`; extractions started before it never store results
    epoch: u64,
}

impl State {
    fn fresh(&mut self, video_id: &str, ttl: Duration) -> Option<Arc<TranscriptResult>> {
        let entry = self.cache.get(video_id)?;
        if entry.stored_at.elapsed() < ttl {
            return Some(entry.result.clone());
        }
        tracing::debug!(video_id, "Cached transcript expired");
        self.cache.remove(video_id);
        None
    }
}

/// The extraction layers, in priority order
pub struct LayerStack {
    pub bridge: Arc<dyn TranscriptLayer>,
    pub page_data: Arc<dyn TranscriptLayer>,
    pub auto_captions: AutoCaptionReprocessor,
    pub panel: Arc<dyn TranscriptLayer>,
}

impl LayerStack {
    /// Run the layers against `page` until one produces an acceptable answer
    pub async fn run(&self, page: &WatchPage) -> TranscriptResult {
        let bridge = guarded(self.bridge.layer(), self.bridge.extract(page)).await;
        log_outcome(&bridge);
        if bridge.status == TranscriptStatus::Ready {
            return bridge;
        }

        let page_data = guarded(self.page_data.layer(), self.page_data.extract(page)).await;
        let page_data = self.auto_captions.reprocess(page_data);
        log_outcome(&page_data);
        if page_data.status != TranscriptStatus::Unavailable {
            return page_data;
        }

        let panel = guarded(self.panel.layer(), self.panel.extract(page)).await;
        log_outcome(&panel);
        if panel.status.is_success() {
            return panel;
        }

        let reasons: Vec<String> = [&bridge, &page_data, &panel]
            .iter()
            .filter_map(|r| Some(format!("{}: {}", r.extraction_layer?, r.error.as_deref()?)))
            .collect();
        TranscriptResult::unavailable(
            ExtractionLayer::Orchestrator,
            format!("All extraction methods failed ({})", reasons.join("; ")),
        )
    }
}

fn log_outcome(result: &TranscriptResult) {
    let layer = result.extraction_layer.map(|l| l.as_str()).unwrap_or("unknown");
    match result.status {
        TranscriptStatus::Error => {
            tracing::warn!(layer, "Layer failed: {}", result.error.as_deref().unwrap_or_default())
        }
        status => tracing::info!(layer, %status, segments = result.segments.len(), "Layer finished"),
    }
}

struct Inner {
    loader: Arc<dyn PageLoader>,
    layers: LayerStack,
    ttl: Duration,
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn extract(&self, video_id: &str) -> TranscriptResult {
        if video_id.trim().is_empty() {
            return TranscriptResult::error(ExtractionLayer::Orchestrator, TranscriptorError::MissingVideoId.to_string());
        }

        let page = match self.loader.load(video_id).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(video_id, "Page load failed: {:#}", e);
                return TranscriptResult::error(ExtractionLayer::Orchestrator, format!("{:#}", e));
            }
        };

        self.layers.run(&page).await
    }

    fn store(&self, video_id: &str, epoch: u64, result: &Arc<TranscriptResult>) {
        let mut state = self.state();
        if state.epoch != epoch {
            tracing::debug!(video_id, "Discarding result of an extraction started before reset");
            return;
        }
        if result.is_cacheable() {
            state.cache.insert(
                video_id.to_string(),
                CacheEntry { result: result.clone(), stored_at: Instant::now() },
            );
        }
    }
}

/// Removes its pending entry when the extraction task ends, however it ends
struct PendingSlot {
    inner: Arc<Inner>,
    video_id: String,
    id: Uuid,
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        if state.pending.get(&self.video_id).is_some_and(|p| p.id == self.id) {
            state.pending.remove(&self.video_id);
        }
    }
}

/// Cache-backed, de-duplicating transcript extraction
#[derive(Clone)]
pub struct TranscriptService {
    inner: Arc<Inner>,
}

impl TranscriptService {
    pub fn new(loader: Arc<dyn PageLoader>, layers: LayerStack, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader,
                layers,
                ttl,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Build the service with HTTP page loading and caption fetching
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_client(&config.http)?;
        let loader = Arc::new(HttpPageLoader::new(&config.http)?);
        let decoder = Arc::new(CaptionDecoder::new(
            Arc::new(HttpCaptionFetcher::new(client)),
            &config.extraction,
        ));

        let layers = LayerStack {
            bridge: Arc::new(BridgeLayer::new(
                decoder.clone(),
                config.extraction.bridge_timeout(),
                config.extraction.bridge_poll_interval(),
            )),
            page_data: Arc::new(PageDataLayer::new(decoder)),
            auto_captions: AutoCaptionReprocessor::new(config.merge.min_duration_secs),
            panel: Arc::new(PanelLayer::new(&config.panel)),
        };

        Ok(Self::new(loader, layers, config.cache.ttl()))
    }

    /// Extract the transcript of `video_id`.
    ///
    /// A fresh cached result is returned as-is. Concurrent calls for one
    /// video share a single extraction and receive the same result.
    pub async fn extract_transcript(&self, video_id: &str) -> Arc<TranscriptResult> {
        let extraction = {
            let mut state = self.inner.state();
            if let Some(cached) = state.fresh(video_id, self.inner.ttl) {
                tracing::debug!(video_id, "Serving cached transcript");
                return cached;
            }

            match state.pending.get(video_id) {
                Some(pending) => {
                    tracing::debug!(video_id, "Joining in-flight extraction");
                    pending.extraction.clone()
                }
                None => {
                    let id = Uuid::new_v4();
                    let extraction = self.start(video_id, id, state.epoch);
                    state.pending.insert(
                        video_id.to_string(),
                        PendingExtraction { id, extraction: extraction.clone() },
                    );
                    extraction
                }
            }
        };

        extraction.await
    }

    fn start(&self, video_id: &str, id: Uuid, epoch: u64) -> SharedExtraction {
        tracing::info!(video_id, "Starting transcript extraction");
        let slot = PendingSlot {
            inner: self.inner.clone(),
            video_id: video_id.to_string(),
            id,
        };

        let task = tokio::spawn(async move {
            let result = Arc::new(slot.inner.extract(&slot.video_id).await);
            slot.inner.store(&slot.video_id, epoch, &result);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Extraction task failed: {}", e);
                    Arc::new(TranscriptResult::error(
                        ExtractionLayer::Orchestrator,
                        format!("Extraction task failed: {}", e),
                    ))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Status of `video_id` without starting any work
    pub fn get_status(&self, video_id: &str) -> TranscriptStatus {
        let mut state = self.inner.state();
        if let Some(cached) = state.fresh(video_id, self.inner.ttl) {
            return cached.status;
        }
        if state.pending.contains_key(video_id) {
            TranscriptStatus::Loading
        } else {
            TranscriptStatus::Idle
        }
    }

    pub fn get_cached_result(&self, video_id: &str) -> Option<Arc<TranscriptResult>> {
        self.inner.state().fresh(video_id, self.inner.ttl)
    }

    /// Evict one video's entry, or every entry when `video_id` is `None`
    pub fn clear_cache(&self, video_id: Option<&str>) {
        let mut state = self.inner.state();
        match video_id {
            Some(id) => {
                state.cache.remove(id);
            }
            None => state.cache.clear(),
        }
    }

    /// Forget every cached and in-flight extraction.
    ///
    /// Extractions still running finish for their current callers but never
    /// populate the cache.
    pub fn reset(&self) {
        let mut state = self.inner.state();
        state.cache.clear();
        state.pending.clear();
        state.epoch += 1;
        tracing::debug!(epoch = state.epoch, "Transcript service reset");
    }

    pub fn dispose(self) {
        self.reset();
    }

    /// Cached segments overlapping `[start, end]`
    pub fn segments_in_range(&self, video_id: &str, start: f64, end: f64) -> Vec<TranscriptSegment> {
        self.get_cached_result(video_id)
            .map(|result| {
                result
                    .segments
                    .iter()
                    .filter(|s| s.overlaps(start, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The cached segment being spoken at `time`
    pub fn segment_at_time(&self, video_id: &str, time: f64) -> Option<TranscriptSegment> {
        let result = self.get_cached_result(video_id)?;
        let last = result.segments.len().checked_sub(1)?;
        result
            .segments
            .iter()
            .enumerate()
            .find(|(i, s)| s.start_time <= time && (time < s.end_time || (*i == last && time <= s.end_time)))
            .map(|(_, s)| s.clone())
    }

    pub fn full_text(&self, video_id: &str) -> Option<String> {
        self.get_cached_result(video_id).map(|result| result.full_text())
    }

    pub fn text_in_range(&self, video_id: &str, start: f64, end: f64) -> String {
        join_text(&self.segments_in_range(video_id, start, end))
    }

    /// One `[m:ss] text` line per cached segment
    pub fn formatted_transcript(&self, video_id: &str) -> Option<String> {
        let result = self.get_cached_result(video_id)?;
        let lines: Vec<String> = result
            .segments
            .iter()
            .map(|s| format!("[{}] {}", format_timestamp(s.start_time), s.cleaned_text))
            .collect();
        Some(lines.join("\n"))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use async_trait::async_trait;
    use futures_util::future::join_all;

    use crate::transcript::TranscriptStatus::{Error, Partial, Ready, Unavailable};

    #[tokio::test]
    async fn test_cached_result_is_reference_equal() {
        let (stack, stubs) = stack(Ready, Unavailable, Unavailable);
        let loader = StubLoader::new(Duration::ZERO);
        let service = service(stack, loader.clone());

        let first = service.extract_transcript("abcdefghijk").await;
        let second = service.extract_transcript("abcdefghijk").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.loads(), 1);
        assert_eq!(stubs[0].calls(), 1);
        assert_eq!(service.get_status("abcdefghijk"), Ready);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_extraction() {
        let (stack, stubs) = stack(Ready, Unavailable, Unavailable);
        let loader = StubLoader::new(Duration::from_millis(50));
        let service = service(stack, loader.clone());

        let calls = (0..5).map(|_| service.extract_transcript("abcdefghijk"));
        let results = join_all(calls).await;

        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(loader.loads(), 1);
        assert_eq!(stubs[0].calls(), 1);
    }

    #[tokio::test]
    async fn test_status_is_loading_while_in_flight() {
        let (stack, _) = stack(Ready, Unavailable, Unavailable);
        let service = service(stack, StubLoader::new(Duration::from_millis(100)));
        assert_eq!(service.get_status("abcdefghijk"), TranscriptStatus::Idle);

        let background = service.clone();
        let handle = tokio::spawn(async move { background.extract_transcript("abcdefghijk").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.get_status("abcdefghijk"), TranscriptStatus::Loading);

        handle.await.unwrap();
        assert_eq!(service.get_status("abcdefghijk"), Ready);
    }

    #[tokio::test]
    async fn test_definite_page_data_answer_skips_panel() {
        let (stack, stubs) = stack(Unavailable, Error, Ready);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let result = service.extract_transcript("abcdefghijk").await;
        assert_eq!(result.status, Error);
        assert_eq!(result.extraction_layer, Some(ExtractionLayer::PageData));
        assert_eq!(stubs[2].calls(), 0);
    }

    #[tokio::test]
    async fn test_ready_bridge_skips_everything_else() {
        let (stack, stubs) = stack(Ready, Ready, Ready);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        service.extract_transcript("abcdefghijk").await;
        assert_eq!(stubs[1].calls(), 0);
        assert_eq!(stubs[2].calls(), 0);
    }

    #[tokio::test]
    async fn test_bridge_error_falls_through_to_page_data() {
        let (stack, stubs) = stack(Error, Ready, Unavailable);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let result = service.extract_transcript("abcdefghijk").await;
        assert_eq!(result.extraction_layer, Some(ExtractionLayer::PageData));
        assert_eq!(stubs[1].calls(), 1);
    }

    #[tokio::test]
    async fn test_auto_generated_page_data_is_rechunked() {
        let (mut stack, stubs) = stack(Unavailable, Ready, Unavailable);
        stack.auto_captions = AutoCaptionReprocessor::new(4.0);
        stubs[1].auto_generated();
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let result = service.extract_transcript("abcdefghijk").await;
        assert_eq!(result.status, Ready);
        assert_eq!(result.extraction_layer, Some(ExtractionLayer::AutoCaption));
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].cleaned_text, "first second");
        assert_eq!(result.metadata.as_ref().unwrap().segment_count, 2);
    }

    #[tokio::test]
    async fn test_auto_generated_bridge_result_is_left_alone() {
        let (mut stack, stubs) = stack(Ready, Unavailable, Unavailable);
        stack.auto_captions = AutoCaptionReprocessor::new(4.0);
        stubs[0].auto_generated();
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let result = service.extract_transcript("abcdefghijk").await;
        assert_eq!(result.extraction_layer, Some(ExtractionLayer::PageBridge));
        assert_eq!(result.segments.len(), 3);
        assert_eq!(result.metadata.as_ref().unwrap().segment_count, 3);
    }

    #[tokio::test]
    async fn test_partial_panel_result_is_cached() {
        let (stack, stubs) = stack(Unavailable, Unavailable, Partial);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let result = service.extract_transcript("abcdefghijk").await;
        assert_eq!(result.status, Partial);
        assert_eq!(stubs[2].calls(), 1);
        assert!(service.get_cached_result("abcdefghijk").is_some());
    }

    #[tokio::test]
    async fn test_exhausted_layers_are_unavailable_and_not_cached() {
        let (stack, stubs) = stack(Unavailable, Unavailable, Unavailable);
        let loader = StubLoader::new(Duration::ZERO);
        let service = service(stack, loader.clone());

        let result = service.extract_transcript("abcdefghijk").await;
        assert_eq!(result.status, Unavailable);
        assert_eq!(result.extraction_layer, Some(ExtractionLayer::Orchestrator));
        assert!(result.error.as_deref().unwrap().contains("All extraction methods failed"));
        assert!(service.get_cached_result("abcdefghijk").is_none());

        service.extract_transcript("abcdefghijk").await;
        assert_eq!(loader.loads(), 2);
        assert_eq!(stubs[0].calls(), 2);
    }

    struct PanickingLayer;

    #[async_trait]
    impl TranscriptLayer for PanickingLayer {
        fn layer(&self) -> ExtractionLayer {
            ExtractionLayer::PageBridge
        }

        async fn extract(&self, _page: &WatchPage) -> TranscriptResult {
            panic!("bridge blew up")
        }
    }

    #[tokio::test]
    async fn test_panicking_layer_is_contained() {
        let (mut stack, stubs) = stack(Unavailable, Unavailable, Ready);
        stack.bridge = Arc::new(PanickingLayer);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let result = service.extract_transcript("abcdefghijk").await;
        assert_eq!(result.status, Ready);
        assert_eq!(result.extraction_layer, Some(ExtractionLayer::RenderedPanel));
        assert_eq!(stubs[2].calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_extracted_again() {
        let (stack, _) = stack(Ready, Unavailable, Unavailable);
        let loader = StubLoader::new(Duration::ZERO);
        let service = TranscriptService::new(loader.clone(), stack, Duration::from_millis(30));

        let first = service.extract_transcript("abcdefghijk").await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(service.get_cached_result("abcdefghijk").is_none());

        let second = service.extract_transcript("abcdefghijk").await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(loader.loads(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_and_reset() {
        let (stack, _) = stack(Ready, Unavailable, Unavailable);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        service.extract_transcript("aaaaaaaaaaa").await;
        service.extract_transcript("bbbbbbbbbbb").await;
        service.clear_cache(Some("aaaaaaaaaaa"));
        assert!(service.get_cached_result("aaaaaaaaaaa").is_none());
        assert!(service.get_cached_result("bbbbbbbbbbb").is_some());

        service.reset();
        assert_eq!(service.get_status("bbbbbbbbbbb"), TranscriptStatus::Idle);
    }

    #[tokio::test]
    async fn test_missing_video_id_is_an_error() {
        let (stack, stubs) = stack(Ready, Ready, Ready);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let result = service.extract_transcript("").await;
        assert_eq!(result.status, Error);
        assert_eq!(stubs[0].calls(), 0);
    }

    #[test]
    fn test_queries_without_cache_do_no_work() {
        let (stack, stubs) = stack(Ready, Ready, Ready);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        assert!(service.segments_in_range("abcdefghijk", 0.0, 10.0).is_empty());
        assert!(service.segment_at_time("abcdefghijk", 1.0).is_none());
        assert!(service.full_text("abcdefghijk").is_none());
        assert_eq!(service.text_in_range("abcdefghijk", 0.0, 10.0), "");
        assert!(service.formatted_transcript("abcdefghijk").is_none());
        assert_eq!(stubs[0].calls(), 0);
    }

    #[tokio::test]
    async fn test_query_helpers_over_cached_segments() {
        let (stack, _) = stack(Ready, Unavailable, Unavailable);
        let service = service(stack, StubLoader::new(Duration::ZERO));
        service.extract_transcript("abcdefghijk").await;

        let in_range = service.segments_in_range("abcdefghijk", 1.0, 3.0);
        assert_eq!(in_range.len(), 2);
        assert_eq!(service.text_in_range("abcdefghijk", 1.0, 3.0), "first second");

        assert_eq!(service.segment_at_time("abcdefghijk", 2.0).unwrap().cleaned_text, "second");
        assert_eq!(service.segment_at_time("abcdefghijk", 65.0).unwrap().cleaned_text, "third");
        assert!(service.segment_at_time("abcdefghijk", 65.5).is_none());

        assert_eq!(service.full_text("abcdefghijk").unwrap(), "first second third");
        assert_eq!(
            service.formatted_transcript("abcdefghijk").unwrap(),
            "[0:00] first\n[0:02] second\n[0:05] third"
        );
    }
}
