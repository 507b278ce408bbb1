use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use reqwest::Client;
use std::sync::{Arc, OnceLock};

pub mod dom;
pub mod scripts;

pub use dom::{HtmlPanel, PanelDom, Probe, RenderedRow};
pub use scripts::{CaptionTrack, EmbeddedScripts, PlayerResponse, ScriptContext};

use crate::bridge::PageBridge;
use crate::config::HttpConfig;
use crate::{Result, TranscriptorError};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// The hosting page of one video
pub struct WatchPage {
    video_id: String,
    html: String,
    scripts: Arc<dyn ScriptContext>,
    dom: Arc<dyn PanelDom>,
    bridge: OnceLock<PageBridge>,
}

impl WatchPage {
    pub fn new(
        video_id: impl Into<String>,
        html: impl Into<String>,
        scripts: Arc<dyn ScriptContext>,
        dom: Arc<dyn PanelDom>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            html: html.into(),
            scripts,
            dom,
            bridge: OnceLock::new(),
        }
    }

    /// A page known only through its delivered markup
    pub fn from_html(video_id: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let scripts = Arc::new(EmbeddedScripts::new(html.clone()));
        let dom = Arc::new(HtmlPanel::new(html.clone()));
        Self::new(video_id, html, scripts, dom)
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn dom(&self) -> &dyn PanelDom {
        self.dom.as_ref()
    }

    /// The page-context bridge, installed on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bridge(&self) -> &PageBridge {
        self.bridge.get_or_init(|| PageBridge::install(self.scripts.clone()))
    }
}

/// Source of hosting pages
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, video_id: &str) -> Result<WatchPage>;
}

/// Loads watch pages over HTTP
pub struct HttpPageLoader {
    client: Client,
}

impl HttpPageLoader {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

/// HTTP client carrying the browser-like headers the watch page expects
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.accept_language)?);
    headers.insert(COOKIE, HeaderValue::from_static("CONSENT=YES+cb; SOCS=CAI"));

    let client = Client::builder()
        .default_headers(headers)
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()?;
    Ok(client)
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, video_id: &str) -> Result<WatchPage> {
        let url = format!("{}{}", WATCH_URL, urlencoding::encode(video_id));
        tracing::debug!("Loading watch page: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(TranscriptorError::PageLoad(format!("HTTP {} for {}", response.status(), url)).into());
        }

        let html = response.text().await?;
        tracing::debug!(bytes = html.len(), "Watch page loaded");
        Ok(WatchPage::from_html(video_id, html))
    }
}
