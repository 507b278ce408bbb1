use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use super::TranscriptLayer;
use crate::captions::text;
use crate::config::PanelConfig;
use crate::page::dom::{ROW_TEXT, ROW_TIMESTAMP, SEGMENT_LIST, SEGMENT_ROW, SHOW_TRANSCRIPT_BUTTON, TRANSCRIPT_PANEL};
use crate::page::{PanelDom, RenderedRow, WatchPage};
use crate::transcript::{ExtractionLayer, TranscriptMetadata, TranscriptResult, TranscriptSegment};
use crate::utils::{parse_timestamp, wait_for, Cadence};

/// The rendered panel carries no durations; the last row is assumed to last this long
pub const LAST_SEGMENT_ESTIMATE_SECS: f64 = 3.0;

/// The panel does not say whether its track is auto-generated
pub const PANEL_TRACK_IS_AUTO_GENERATED: bool = false;

/// The panel does not say whether its track is a translation
pub const PANEL_TRACK_IS_TRANSLATION: bool = false;

pub const PANEL_LANGUAGE_CODE: &str = "und";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Opening,
    WaitingForSegments,
    Scraping,
    Done,
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PanelState::Closed => "closed",
            PanelState::Opening => "opening",
            PanelState::WaitingForSegments => "waiting for segments",
            PanelState::Scraping => "scraping",
            PanelState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Layer D: drives the page's own transcript panel and scrapes its rows
pub struct PanelLayer {
    open_timeout: Duration,
    mount_timeout: Duration,
    settle_wait: Duration,
    poll_interval: Duration,
    max_scroll_attempts: u32,
}

/// Outcome of scrolling the segment list to its end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Materialized {
    Settled,
    BudgetExhausted,
}

struct Run<'a> {
    dom: &'a dyn PanelDom,
    state: PanelState,
}

impl Run<'_> {
    fn enter(&mut self, next: PanelState) {
        tracing::debug!(from = %self.state, to = %next, "Panel scrape advancing");
        self.state = next;
    }

    fn give_up(&self, reason: &str) -> TranscriptResult {
        tracing::info!(state = %self.state, "Panel scrape stopped: {}", reason);
        TranscriptResult::unavailable(ExtractionLayer::RenderedPanel, format!("{} (while {})", reason, self.state))
    }
}

impl PanelLayer {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            open_timeout: Duration::from_millis(config.open_timeout_ms),
            mount_timeout: Duration::from_millis(config.mount_timeout_ms),
            settle_wait: Duration::from_millis(config.scroll_settle_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_scroll_attempts: config.max_scroll_attempts,
        }
    }

    fn cadence(&self, dom: &dyn PanelDom) -> Cadence {
        Cadence::observe_or_poll(dom.mutations(), self.poll_interval)
    }

    /// Scrape the panel of `dom` for `video_id`
    pub async fn scrape(&self, dom: &dyn PanelDom, video_id: &str) -> TranscriptResult {
        let mut run = Run { dom, state: PanelState::Closed };

        if TRANSCRIPT_PANEL.locate(dom).is_none() {
            run.enter(PanelState::Opening);
            let Some(control) = SHOW_TRANSCRIPT_BUTTON.locate(dom) else {
                return run.give_up("Show transcript control not found");
            };
            if !dom.click(control) {
                return run.give_up("Show transcript control could not be activated");
            }
            let opened = wait_for(self.open_timeout, self.cadence(dom), || TRANSCRIPT_PANEL.locate(dom)).await;
            if opened.is_none() {
                return run.give_up("Transcript panel did not open");
            }
        }

        run.enter(PanelState::WaitingForSegments);
        let Some(list) = wait_for(self.mount_timeout, self.cadence(dom), || SEGMENT_LIST.locate(dom)).await else {
            return run.give_up("Transcript segment list did not mount");
        };

        run.enter(PanelState::Scraping);
        let materialized = self.materialize(run.dom, list).await;

        let Some(row) = SEGMENT_ROW.locate(dom) else {
            return run.give_up("No transcript rows rendered");
        };
        let rows = dom.rows(list, row, ROW_TIMESTAMP, ROW_TEXT);
        let segments = rows_to_segments(&rows);
        if segments.is_empty() {
            return run.give_up("Transcript panel had no readable rows");
        }

        run.enter(PanelState::Done);
        let metadata = TranscriptMetadata::describe(
            video_id,
            None,
            PANEL_LANGUAGE_CODE,
            PANEL_TRACK_IS_AUTO_GENERATED,
            PANEL_TRACK_IS_TRANSLATION,
            &segments,
        );
        match materialized {
            Materialized::Settled => TranscriptResult::ready(segments, metadata, ExtractionLayer::RenderedPanel),
            Materialized::BudgetExhausted => {
                tracing::warn!(rows = rows.len(), "Scroll budget exhausted before the list settled");
                TranscriptResult::partial(segments, metadata, ExtractionLayer::RenderedPanel)
            }
        }
    }

    /// Scroll `list` to its bottom until its height stops growing, then back to the top
    async fn materialize(&self, dom: &dyn PanelDom, list: &str) -> Materialized {
        let mut height = dom.scroll_height(list).unwrap_or(0.0);
        let mut outcome = Materialized::BudgetExhausted;

        for attempt in 1..=self.max_scroll_attempts {
            dom.scroll_to(list, height);
            let seen = height;
            let grown = wait_for(self.settle_wait, self.cadence(dom), || {
                dom.scroll_height(list).filter(|h| *h > seen)
            })
            .await;

            match grown {
                Some(next) => {
                    tracing::trace!(attempt, height = next, "Segment list grew");
                    height = next;
                }
                None => {
                    tracing::debug!(attempt, height, "Segment list settled");
                    outcome = Materialized::Settled;
                    break;
                }
            }
        }

        dom.scroll_to(list, 0.0);
        outcome
    }
}

#[async_trait]
impl TranscriptLayer for PanelLayer {
    fn layer(&self) -> ExtractionLayer {
        ExtractionLayer::RenderedPanel
    }

    async fn extract(&self, page: &WatchPage) -> TranscriptResult {
        self.scrape(page.dom(), page.video_id()).await
    }
}

/// Turn scraped rows into segments whose end is the next row's start.
///
/// Rows with an unreadable timestamp or empty text are dropped.
pub fn rows_to_segments(rows: &[RenderedRow]) -> Vec<TranscriptSegment> {
    let parsed: Vec<(f64, String, String)> = rows
        .iter()
        .filter_map(|row| {
            let start = parse_timestamp(&row.timestamp)?;
            let (raw, cleaned) = text::normalize(&row.text)?;
            Some((start, raw, cleaned))
        })
        .collect();

    parsed
        .iter()
        .enumerate()
        .map(|(i, (start, raw, cleaned))| {
            let end = parsed
                .get(i + 1)
                .map(|(next, _, _)| *next)
                .unwrap_or(start + LAST_SEGMENT_ESTIMATE_SECS);
            TranscriptSegment::new(*start, end, raw.clone(), cleaned.clone())
        })
        .collect()
}
