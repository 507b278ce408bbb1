use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::Arc;

use super::{CaptionDecoder, TranscriptLayer};
use crate::page::scripts::{first_json_value, Captions};
use crate::page::{CaptionTrack, PlayerResponse, WatchPage};
use crate::transcript::{ExtractionLayer, TranscriptResult};
use crate::TranscriptorError;

/// Where a probe searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSource {
    /// The delivered markup as-is
    Markup,
    /// Concatenated bodies of the page's inline `<script>` elements
    ScriptBodies,
}

/// What the JSON value following a probe's marker looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeShape {
    PlayerResponse,
    /// A string holding an encoded player response
    EncodedPlayerResponse,
    /// The `captions` block of a player response
    Captions,
    TrackArray,
}

/// One textual pattern search for caption-track metadata
#[derive(Debug, Clone, Copy)]
pub struct TrackProbe {
    pub name: &'static str,
    pub source: ProbeSource,
    /// Regex whose match ends right where the JSON value starts
    pub marker: &'static str,
    pub shape: ProbeShape,
}

pub const TRACK_PROBES: &[TrackProbe] = &[
    TrackProbe {
        name: "initial player response",
        source: ProbeSource::ScriptBodies,
        marker: r"\bytInitialPlayerResponse\s*=\s*",
        shape: ProbeShape::PlayerResponse,
    },
    TrackProbe {
        name: "player config response",
        source: ProbeSource::ScriptBodies,
        marker: r#"["']?(?:raw_)?player_response["']?\s*:\s*"#,
        shape: ProbeShape::EncodedPlayerResponse,
    },
    TrackProbe {
        name: "captions block",
        source: ProbeSource::Markup,
        marker: r#""captions"\s*:\s*"#,
        shape: ProbeShape::Captions,
    },
    TrackProbe {
        name: "caption track list",
        source: ProbeSource::Markup,
        marker: r#""captionTracks"\s*:\s*"#,
        shape: ProbeShape::TrackArray,
    },
];

/// What a probe recovered
#[derive(Debug, Default)]
pub struct ProbeHit {
    pub tracks: Vec<CaptionTrack>,
    pub response: Option<PlayerResponse>,
}

impl TrackProbe {
    /// Run the probe over `page`, returning the first occurrence that parses
    pub fn run(&self, markup: &str, scripts: &str) -> Option<ProbeHit> {
        let haystack = match self.source {
            ProbeSource::Markup => markup,
            ProbeSource::ScriptBodies => scripts,
        };
        let marker = Regex::new(self.marker).ok()?;

        let hit = marker
            .find_iter(haystack)
            .find_map(|m| self.interpret(&haystack[m.end()..]));
        hit
    }

    fn interpret(&self, rest: &str) -> Option<ProbeHit> {
        match self.shape {
            ProbeShape::PlayerResponse => {
                let value: Value = first_json_value(rest)?;
                let response = PlayerResponse::from_value(value)?;
                Some(ProbeHit { tracks: response.caption_tracks(), response: Some(response) })
            }
            ProbeShape::EncodedPlayerResponse => {
                let encoded: String = first_json_value(rest)?;
                let response = PlayerResponse::from_value(Value::String(encoded))?;
                Some(ProbeHit { tracks: response.caption_tracks(), response: Some(response) })
            }
            ProbeShape::Captions => {
                let captions: Captions = first_json_value(rest)?;
                let tracks = captions
                    .player_captions_tracklist_renderer
                    .map(|r| r.caption_tracks)
                    .unwrap_or_default();
                Some(ProbeHit { tracks, response: None })
            }
            ProbeShape::TrackArray => {
                let tracks: Vec<CaptionTrack> = first_json_value(rest)?;
                Some(ProbeHit { tracks, response: None })
            }
        }
    }
}

fn script_bodies(markup: &str) -> String {
    let Ok(selector) = Selector::parse("script") else {
        return String::new();
    };
    let document = Html::parse_document(markup);
    document
        .select(&selector)
        .map(|script| script.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Layer B: caption tracks recovered by inspecting the page's own markup
pub struct PageDataLayer {
    decoder: Arc<CaptionDecoder>,
    probes: &'static [TrackProbe],
}

impl PageDataLayer {
    pub fn new(decoder: Arc<CaptionDecoder>) -> Self {
        Self::with_probes(decoder, TRACK_PROBES)
    }

    pub fn with_probes(decoder: Arc<CaptionDecoder>, probes: &'static [TrackProbe]) -> Self {
        Self { decoder, probes }
    }

    /// Run the probes in order. The first non-empty track list wins; when
    /// none is found the first unavailability reason seen is returned.
    pub fn recover_tracks(&self, markup: &str) -> std::result::Result<Vec<CaptionTrack>, String> {
        let scripts = script_bodies(markup);
        let mut reason = None;

        for probe in self.probes {
            let Some(hit) = probe.run(markup, &scripts) else {
                tracing::debug!(probe = probe.name, "Probe found nothing");
                continue;
            };
            if !hit.tracks.is_empty() {
                tracing::debug!(probe = probe.name, tracks = hit.tracks.len(), "Probe recovered caption tracks");
                return Ok(hit.tracks);
            }
            if reason.is_none() {
                reason = hit.response.as_ref().and_then(PlayerResponse::unavailability);
            }
        }

        Err(reason.unwrap_or("No caption tracks found in page data").to_string())
    }
}

#[async_trait]
impl TranscriptLayer for PageDataLayer {
    fn layer(&self) -> ExtractionLayer {
        ExtractionLayer::PageData
    }

    async fn extract(&self, page: &WatchPage) -> TranscriptResult {
        let layer = self.layer();
        let video_id = page.video_id();
        if video_id.trim().is_empty() {
            return TranscriptResult::error(layer, TranscriptorError::MissingVideoId.to_string());
        }

        match self.recover_tracks(page.html()) {
            Ok(tracks) => self.decoder.decode_tracks(video_id, &tracks, layer).await,
            Err(reason) => TranscriptResult::unavailable(layer, reason),
        }
    }
}
