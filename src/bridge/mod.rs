//! Page-context bridge.
//!
//! The bridge runs next to the hosting page's script context and is the
//! only way caption metadata crosses out of it. Requests go in over an
//! `mpsc` channel carrying a correlation id; results come back as a
//! broadcast [`BridgeMessage`]. Each request is answered exactly once.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::page::{CaptionTrack, PlayerResponse, ScriptContext};
use crate::utils::{wait_for, Cadence};

/// Globals that may hold the player response, most reliable first
pub const PLAYER_GLOBALS: &[&str] = &[
    "ytInitialPlayerResponse",
    "ytplayer.config.args.raw_player_response",
    "ytplayer.config.args.player_response",
];

const EVENT_CAPACITY: usize = 16;

/// Result published across the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMessage {
    /// Correlation id of the request this answers; absent for the load-time publish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,

    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,

    pub video_id: Option<String>,

    pub video_title: Option<String>,

    pub video_duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeMessage {
    fn not_found(request_id: Option<Uuid>) -> Self {
        Self {
            request_id,
            caption_tracks: Vec::new(),
            video_id: None,
            video_title: None,
            video_duration: None,
            error: Some("player response not found in page context".to_string()),
        }
    }
}

#[derive(Debug)]
struct ExtractRequest {
    id: Uuid,
}

/// Handle to an installed bridge; dropping it tears the bridge down
pub struct PageBridge {
    requests: mpsc::UnboundedSender<ExtractRequest>,
    events: broadcast::Sender<BridgeMessage>,
    task: JoinHandle<()>,
}

impl PageBridge {
    /// Install a bridge over `scripts`. It reads the page immediately and
    /// again for every request. Must be called within a tokio runtime.
    pub fn install(scripts: Arc<dyn ScriptContext>) -> Self {
        let (requests, inbox) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let task = tokio::spawn(run(scripts, inbox, events.clone()));
        tracing::debug!("Page-context bridge installed");
        Self { requests, events, task }
    }

    /// Subscribe to every message the bridge publishes
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeMessage> {
        self.events.subscribe()
    }

    /// Ask the bridge to re-read the page and wait for the correlated answer
    pub async fn request_tracks(&self, limit: Duration, poll: Duration) -> Option<BridgeMessage> {
        let mut inbox = self.events.subscribe();
        let id = Uuid::new_v4();

        if self.requests.send(ExtractRequest { id }).is_err() {
            tracing::warn!("Page-context bridge is no longer running");
            return None;
        }

        let reply = wait_for(limit, Cadence::Poll(poll), || loop {
            match inbox.try_recv() {
                Ok(message) if message.request_id == Some(id) => return Some(message),
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        })
        .await;

        if reply.is_none() {
            tracing::debug!(%id, "Page-context bridge did not answer in time");
        }
        reply
    }
}

impl Drop for PageBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    scripts: Arc<dyn ScriptContext>,
    mut inbox: mpsc::UnboundedReceiver<ExtractRequest>,
    events: broadcast::Sender<BridgeMessage>,
) {
    // Nobody may be listening yet; a failed send is fine.
    let _ = events.send(read_player_data(scripts.as_ref(), None));

    while let Some(request) = inbox.recv().await {
        let message = read_player_data(scripts.as_ref(), Some(request.id));
        tracing::trace!(id = %request.id, tracks = message.caption_tracks.len(), "Bridge answering");
        let _ = events.send(message);
    }
}

/// Read the player response out of the script context
pub fn read_player_data(scripts: &dyn ScriptContext, request_id: Option<Uuid>) -> BridgeMessage {
    let response = PLAYER_GLOBALS
        .iter()
        .filter_map(|path| scripts.global(path))
        .find_map(PlayerResponse::from_value);

    let Some(response) = response else {
        return BridgeMessage::not_found(request_id);
    };

    BridgeMessage {
        request_id,
        caption_tracks: response.caption_tracks(),
        video_id: response.video_id(),
        video_title: response.title(),
        video_duration: response.duration_seconds(),
        error: response.unavailability().map(str::to_string),
    }
}
