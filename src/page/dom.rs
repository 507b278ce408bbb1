//! Rendered-document access for the transcript panel.

use scraper::{ElementRef, Html, Selector};
use tokio::sync::watch;

/// One row of the rendered transcript list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub timestamp: String,
    pub text: String,
}

/// Synchronous document primitives the panel scraper drives
pub trait PanelDom: Send + Sync {
    fn exists(&self, selector: &str) -> bool;

    /// Activate the first element matching `selector`; false when absent
    fn click(&self, selector: &str) -> bool;

    fn scroll_height(&self, selector: &str) -> Option<f64>;

    fn scroll_to(&self, selector: &str, top: f64);

    /// Materialized rows inside `container`, reading each row's timestamp and
    /// text through the first matching sub-selector
    fn rows(&self, container: &str, row: &str, timestamp: &[&str], text: &[&str]) -> Vec<RenderedRow>;

    /// Feed that ticks whenever the document mutates, when the document can observe itself
    fn mutations(&self) -> Option<watch::Receiver<u64>> {
        None
    }
}

/// An ordered list of alternative selectors for one capability
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub capability: &'static str,
    pub selectors: &'static [&'static str],
}

impl Probe {
    /// First selector that matches in `dom`
    pub fn locate(&self, dom: &dyn PanelDom) -> Option<&'static str> {
        let found = self.selectors.iter().copied().find(|selector| dom.exists(selector));
        match found {
            Some(selector) => tracing::debug!(capability = self.capability, selector, "Located element"),
            None => tracing::debug!(capability = self.capability, "No selector matched"),
        }
        found
    }
}

pub const TRANSCRIPT_PANEL: Probe = Probe {
    capability: "open transcript panel",
    selectors: &[
        r#"ytd-engagement-panel-section-list-renderer[target-id="engagement-panel-searchable-transcript"][visibility="ENGAGEMENT_PANEL_VISIBILITY_EXPANDED"]"#,
        r#"ytd-engagement-panel-section-list-renderer[target-id="engagement-panel-transcript"][visibility="ENGAGEMENT_PANEL_VISIBILITY_EXPANDED"]"#,
        "ytd-transcript-renderer",
        "ytd-transcript-search-panel-renderer",
    ],
};

pub const SHOW_TRANSCRIPT_BUTTON: Probe = Probe {
    capability: "show transcript control",
    selectors: &[
        "ytd-video-description-transcript-section-renderer button",
        r#"button[aria-label="Show transcript"]"#,
        r#"ytd-button-renderer[aria-label="Show transcript"] button"#,
        r#"tp-yt-paper-item[aria-label="Show transcript"]"#,
    ],
};

pub const SEGMENT_LIST: Probe = Probe {
    capability: "transcript segment list",
    selectors: &[
        "ytd-transcript-segment-list-renderer #segments-container",
        "ytd-transcript-segment-list-renderer",
        "#segments-container",
        "ytd-transcript-body-renderer",
    ],
};

pub const SEGMENT_ROW: Probe = Probe {
    capability: "transcript segment row",
    selectors: &[
        "ytd-transcript-segment-renderer",
        "ytd-transcript-body-renderer .cue-group",
        ".segment",
    ],
};

pub const ROW_TIMESTAMP: &[&str] = &[".segment-timestamp", "#timestamp", ".cue-group-start-offset"];

pub const ROW_TEXT: &[&str] = &[".segment-text", "yt-formatted-string.segment-text", ".cue", "#text"];

/// A rendered document known only through its markup.
///
/// It has no layout and cannot react to clicks, so a panel that is not
/// already mounted in the markup never appears.
pub struct HtmlPanel {
    html: String,
}

impl HtmlPanel {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    fn with_document<T>(&self, f: impl FnOnce(&Html) -> T) -> T {
        let document = Html::parse_document(&self.html);
        f(&document)
    }
}

fn first_text(row: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        row.select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
    })
}

impl PanelDom for HtmlPanel {
    fn exists(&self, selector: &str) -> bool {
        let Ok(selector) = Selector::parse(selector) else {
            return false;
        };
        self.with_document(|doc| doc.select(&selector).next().is_some())
    }

    fn click(&self, selector: &str) -> bool {
        self.exists(selector)
    }

    fn scroll_height(&self, selector: &str) -> Option<f64> {
        self.exists(selector).then_some(0.0)
    }

    fn scroll_to(&self, _selector: &str, _top: f64) {}

    fn rows(&self, container: &str, row: &str, timestamp: &[&str], text: &[&str]) -> Vec<RenderedRow> {
        let (Ok(container), Ok(row)) = (Selector::parse(container), Selector::parse(row)) else {
            return Vec::new();
        };
        self.with_document(|doc| {
            let Some(list) = doc.select(&container).next() else {
                return Vec::new();
            };
            list.select(&row)
                .filter_map(|el| {
                    Some(RenderedRow {
                        timestamp: first_text(el, timestamp)?,
                        text: first_text(el, text)?,
                    })
                })
                .collect()
        })
    }
}
