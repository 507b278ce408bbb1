//! Request/response surface consumed by UI collaborators.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::service::TranscriptService;
use crate::transcript::{TranscriptResult, TranscriptSegment, TranscriptStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscriptRequest {
    GetTranscript {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    GetTranscriptStatus {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    GetTranscriptRange {
        #[serde(rename = "videoId")]
        video_id: String,
        start: f64,
        end: f64,
    },
    GetTranscriptText {
        #[serde(rename = "videoId")]
        video_id: String,
        #[serde(default)]
        start: Option<f64>,
        #[serde(default)]
        end: Option<f64>,
    },
}

impl TranscriptRequest {
    pub fn video_id(&self) -> &str {
        match self {
            TranscriptRequest::GetTranscript { video_id }
            | TranscriptRequest::GetTranscriptStatus { video_id }
            | TranscriptRequest::GetTranscriptRange { video_id, .. }
            | TranscriptRequest::GetTranscriptText { video_id, .. } => video_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub status: TranscriptStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TranscriptResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<TranscriptSegment>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TranscriptResponse {
    fn status(status: TranscriptStatus) -> Self {
        Self { status, result: None, segments: None, text: None }
    }
}

/// Answer one request, awaiting an extraction when nothing is cached.
///
/// Status requests never start work.
pub async fn handle_request(service: &TranscriptService, request: TranscriptRequest) -> TranscriptResponse {
    tracing::debug!(?request, "Handling transcript request");

    if let TranscriptRequest::GetTranscriptStatus { video_id } = &request {
        return TranscriptResponse::status(service.get_status(video_id));
    }

    let result = ensure_result(service, request.video_id()).await;
    let mut response = TranscriptResponse::status(result.status);

    match request {
        TranscriptRequest::GetTranscript { .. } => {
            response.result = Some(result.as_ref().clone());
        }
        TranscriptRequest::GetTranscriptRange { video_id, start, end } => {
            response.segments = Some(service.segments_in_range(&video_id, start, end));
        }
        TranscriptRequest::GetTranscriptText { video_id, start, end } => {
            let text = match (start, end) {
                (None, None) => result.full_text(),
                (start, end) => service.text_in_range(&video_id, start.unwrap_or(0.0), end.unwrap_or(f64::INFINITY)),
            };
            response.text = Some(text);
        }
        TranscriptRequest::GetTranscriptStatus { .. } => {}
    }

    response
}

async fn ensure_result(service: &TranscriptService, video_id: &str) -> Arc<TranscriptResult> {
    match service.get_cached_result(video_id) {
        Some(cached) => cached,
        None => service.extract_transcript(video_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;
    use std::time::Duration;
    use crate::transcript::TranscriptStatus::{Idle, Ready, Unavailable};

    #[test]
    fn test_request_wire_format() {
        let request: TranscriptRequest =
            serde_json::from_str(r#"{"type":"GET_TRANSCRIPT_RANGE","videoId":"abcdefghijk","start":1.5,"end":4}"#).unwrap();
        assert_eq!(
            request,
            TranscriptRequest::GetTranscriptRange { video_id: "abcdefghijk".to_string(), start: 1.5, end: 4.0 }
        );

        let text: TranscriptRequest = serde_json::from_str(r#"{"type":"GET_TRANSCRIPT_TEXT","videoId":"x"}"#).unwrap();
        assert_eq!(text.video_id(), "x");
    }

    #[tokio::test]
    async fn test_status_request_does_not_extract() {
        let (stack, stubs) = stack(Ready, Unavailable, Unavailable);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let response = handle_request(
            &service,
            TranscriptRequest::GetTranscriptStatus { video_id: "abcdefghijk".to_string() },
        )
        .await;
        assert_eq!(response.status, Idle);
        assert_eq!(stubs[0].calls(), 0);
    }

    #[tokio::test]
    async fn test_range_and_text_requests() {
        let (stack, _) = stack(Ready, Unavailable, Unavailable);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let range = handle_request(
            &service,
            TranscriptRequest::GetTranscriptRange { video_id: "abcdefghijk".to_string(), start: 3.0, end: 4.0 },
        )
        .await;
        assert_eq!(range.status, Ready);
        assert_eq!(range.segments.unwrap().len(), 1);

        let text = handle_request(
            &service,
            TranscriptRequest::GetTranscriptText { video_id: "abcdefghijk".to_string(), start: None, end: None },
        )
        .await;
        assert_eq!(text.text.as_deref(), Some("first second third"));

        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["status"], "READY");
        assert!(json.get("result").is_none());
    }

    #[tokio::test]
    async fn test_unavailable_transcript_response() {
        let (stack, _) = stack(Unavailable, Unavailable, Unavailable);
        let service = service(stack, StubLoader::new(Duration::ZERO));

        let response = handle_request(
            &service,
            TranscriptRequest::GetTranscript { video_id: "abcdefghijk".to_string() },
        )
        .await;
        assert_eq!(response.status, Unavailable);
        assert!(response.result.unwrap().error.is_some());
    }
}
