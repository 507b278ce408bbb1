use url::Url;

use crate::captions::CaptionFormat;
use crate::page::CaptionTrack;
use crate::{Result, TranscriptorError};

const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

/// The track chosen for a video, plus the translation target if one applies
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSelection {
    pub track: CaptionTrack,
    pub translate_to: Option<String>,
}

impl TrackSelection {
    pub fn is_translation(&self) -> bool {
        self.translate_to.is_some()
    }

    pub fn language_code(&self) -> &str {
        self.translate_to.as_deref().unwrap_or(&self.track.language_code)
    }
}

/// Pick the track to fetch.
///
/// Preference order: an authored track in a preferred language, an
/// auto-generated track in a preferred language, the first translatable
/// track translated to `translate_to`, and finally the first track as-is.
pub fn select_track(tracks: &[CaptionTrack], preferred: &[String], translate_to: Option<&str>) -> Option<TrackSelection> {
    let in_language = |auto: bool| {
        preferred.iter().find_map(|lang| {
            tracks
                .iter()
                .find(|t| t.language_code.eq_ignore_ascii_case(lang) && t.is_auto_generated() == auto)
        })
    };

    if let Some(track) = in_language(false).or_else(|| in_language(true)) {
        return Some(TrackSelection { track: track.clone(), translate_to: None });
    }

    if let Some(target) = translate_to {
        if let Some(track) = tracks.iter().find(|t| t.is_translatable) {
            return Some(TrackSelection {
                track: track.clone(),
                translate_to: Some(target.to_string()),
            });
        }
    }

    tracks.first().map(|track| TrackSelection { track: track.clone(), translate_to: None })
}

/// Build the payload URL for a selection, requesting `format` when given
pub fn caption_url(selection: &TrackSelection, format: Option<CaptionFormat>) -> Result<String> {
    let base = selection.track.base_url.trim();
    let mut url = Url::parse(base)
        .or_else(|_| Url::parse(YOUTUBE_ORIGIN).and_then(|origin| origin.join(base)))
        .map_err(|e| TranscriptorError::Decode(format!("invalid caption URL {:?}: {}", base, e)))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let replaced = (key == "fmt" && format.is_some()) || (key == "tlang" && selection.is_translation());
            !replaced
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &kept {
            query.append_pair(key, value);
        }
        if let Some(format) = format {
            query.append_pair("fmt", format.query_value());
        }
        if let Some(target) = &selection.translate_to {
            query.append_pair("tlang", target);
        }
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, kind: Option<&str>, translatable: bool) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?v=abc&lang={}", lang),
            language_code: lang.to_string(),
            name: None,
            kind: kind.map(str::to_string),
            vss_id: None,
            is_translatable: translatable,
        }
    }

    fn english() -> Vec<String> {
        vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()]
    }

    #[test]
    fn test_authored_track_beats_auto_generated() {
        let tracks = vec![track("en", Some("asr"), true), track("en", None, true)];
        let chosen = select_track(&tracks, &english(), Some("en")).unwrap();
        assert!(!chosen.track.is_auto_generated());
        assert!(!chosen.is_translation());
    }

    #[test]
    fn test_auto_generated_in_language_beats_translation() {
        let tracks = vec![track("de", None, true), track("en", Some("asr"), true)];
        let chosen = select_track(&tracks, &english(), Some("en")).unwrap();
        assert!(chosen.track.is_auto_generated());
        assert_eq!(chosen.language_code(), "en");
    }

    #[test]
    fn test_translation_fallback() {
        let tracks = vec![track("fr", None, false), track("de", None, true)];
        let chosen = select_track(&tracks, &english(), Some("en")).unwrap();
        assert_eq!(chosen.track.language_code, "de");
        assert_eq!(chosen.language_code(), "en");
        assert!(chosen.is_translation());
    }

    #[test]
    fn test_first_track_as_last_resort() {
        let tracks = vec![track("fr", None, false)];
        let chosen = select_track(&tracks, &english(), None).unwrap();
        assert_eq!(chosen.track.language_code, "fr");
        assert!(select_track(&[], &english(), Some("en")).is_none());
    }

    #[test]
    fn test_caption_url_sets_format_and_translation() {
        let mut selection = TrackSelection { track: track("de", None, true), translate_to: Some("en".to_string()) };
        selection.track.base_url.push_str("&fmt=srv3");
        let url = caption_url(&selection, Some(CaptionFormat::EventList)).unwrap();
        assert!(url.contains("fmt=json3"));
        assert!(!url.contains("srv3"));
        assert!(url.ends_with("tlang=en"));
        assert_eq!(CaptionFormat::declared_by(&url), Some(CaptionFormat::EventList));
    }

    #[test]
    fn test_relative_caption_url_is_resolved() {
        let mut selection = TrackSelection { track: track("en", None, false), translate_to: None };
        selection.track.base_url = "/api/timedtext?v=abc&lang=en".to_string();
        let url = caption_url(&selection, None).unwrap();
        assert_eq!(url, "https://www.youtube.com/api/timedtext?v=abc&lang=en");
    }
}
