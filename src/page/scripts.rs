//! The hosting page's own script context and the player data it carries.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read-only view of the page's script globals
pub trait ScriptContext: Send + Sync {
    /// Resolve a dotted global path such as `ytplayer.config.args`
    fn global(&self, path: &str) -> Option<Value>;
}

/// Script context recovered from the inline scripts of delivered markup.
///
/// A global is resolved by finding the assignment of its longest assigned
/// prefix and deserializing exactly one JSON value from that point.
pub struct EmbeddedScripts {
    html: String,
}

impl EmbeddedScripts {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    fn assigned(&self, name: &str) -> Option<Value> {
        let escaped = regex::escape(name);
        let pattern = format!(r#"(?:\b{0}|\[\s*["']{0}["']\s*\])\s*=\s*"#, escaped);
        let re = Regex::new(&pattern).ok()?;
        let value = re
            .find_iter(&self.html)
            .find_map(|m| first_json_value::<Value>(&self.html[m.end()..]))
            .filter(|v| !v.is_null());
        value
    }
}

impl ScriptContext for EmbeddedScripts {
    fn global(&self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.split('.').collect();
        for split in (1..=parts.len()).rev() {
            let Some(root) = self.assigned(&parts[..split].join(".")) else {
                continue;
            };
            let value = parts[split..].iter().try_fold(root, |v, key| v.get(key).cloned())?;
            return (!value.is_null()).then_some(value);
        }
        None
    }
}

/// Deserialize the single JSON value at the start of `source`, ignoring what follows
pub fn first_json_value<T: serde::de::DeserializeOwned>(source: &str) -> Option<T> {
    serde_json::Deserializer::from_str(source)
        .into_iter::<T>()
        .next()
        .and_then(|parsed| parsed.ok())
}

/// Descriptor of one available caption track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,

    #[serde(default)]
    pub language_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<TrackName>,

    /// `asr` for automatic speech recognition tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vss_id: Option<String>,

    #[serde(default)]
    pub is_translatable: bool,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
            || self.vss_id.as_deref().is_some_and(|id| id.starts_with("a."))
    }

    pub fn display_name(&self) -> Option<String> {
        self.name.as_ref().and_then(TrackName::text)
    }
}

/// Track label, delivered either as `simpleText` or as text runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<Vec<TextRun>>,
}

impl TrackName {
    pub fn text(&self) -> Option<String> {
        if let Some(text) = &self.simple_text {
            return Some(text.clone());
        }
        let joined: String = self.runs.as_ref()?.iter().map(|r| r.text.as_str()).collect();
        (!joined.is_empty()).then_some(joined)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub text: String,
}

/// The parts of the player response the extractor reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub captions: Option<Captions>,
    pub video_details: Option<VideoDetails>,
    pub playability_status: Option<PlayabilityStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    pub player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracklistRenderer {
    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub length_seconds: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayabilityStatus {
    pub status: Option<String>,
    pub reason: Option<String>,
}

impl PlayerResponse {
    /// Interpret a global's value; string-encoded responses are decoded first
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(encoded) => serde_json::from_str(&encoded).ok(),
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    pub fn caption_tracks(&self) -> Vec<CaptionTrack> {
        self.captions
            .as_ref()
            .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
            .map(|r| r.caption_tracks.clone())
            .unwrap_or_default()
    }

    /// Why no transcript can exist for this response, if that is known
    pub fn unavailability(&self) -> Option<&'static str> {
        let status = self.playability_status.as_ref().and_then(|p| p.status.as_deref());
        match status {
            Some("ERROR") | Some("LOGIN_REQUIRED") | Some("UNPLAYABLE") => Some("Video is unavailable"),
            _ if self.captions.is_none() && self.video_details.is_some() => {
                Some("Transcripts are disabled for this video")
            }
            _ => None,
        }
    }

    pub fn video_id(&self) -> Option<String> {
        self.video_details.as_ref().and_then(|d| d.video_id.clone())
    }

    pub fn title(&self) -> Option<String> {
        self.video_details.as_ref().and_then(|d| d.title.clone())
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.video_details
            .as_ref()
            .and_then(|d| d.length_seconds.as_deref())
            .and_then(|s| s.parse::<f64>().ok())
    }
}
