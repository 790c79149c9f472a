//! Gemini REST streaming adapter.
//!
//! Calls `streamGenerateContent` with `alt=sse` and turns the server-sent events
//! into a [`DeltaStream`]. Each conversation keeps its own history and replays it
//! with every request.

use async_trait::async_trait;
use codesynth_core::agent::{ConversationHandle, DeltaStream, ModelService};
use codesynth_core::error::{Result, SynthError};
use codesynth_core::session::{ConversationTurn, MessageRole};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// [`ModelService`] backed by the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiModelService {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiModelService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModelService")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiModelService {
    /// Creates the service.
    ///
    /// # Errors
    ///
    /// Returns `Config` when `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SynthError::config("Gemini API key is empty"));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Points requests at another endpoint root (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl ModelService for GeminiModelService {
    fn create_conversation(
        &self,
        model_id: &str,
        history: Vec<ConversationTurn>,
    ) -> Arc<dyn ConversationHandle> {
        tracing::debug!(model = model_id, turns = history.len(), "Creating Gemini conversation");
        let history = history
            .iter()
            .filter(|turn| !turn.text.is_empty())
            .map(Content::from)
            .collect();
        Arc::new(GeminiConversation {
            client: self.client.clone(),
            url: format!(
                "{}/{model}:streamGenerateContent?alt=sse&key={api_key}",
                self.base_url,
                model = model_id,
                api_key = self.api_key
            ),
            history: Arc::new(Mutex::new(history)),
        })
    }
}

/// One conversation; the request URL already carries model and key.
struct GeminiConversation {
    client: Client,
    url: String,
    history: Arc<Mutex<Vec<Content>>>,
}

#[async_trait]
impl ConversationHandle for GeminiConversation {
    async fn send_streaming(&self, message: &str) -> Result<DeltaStream> {
        let user = Content::text("user", message);
        let mut contents = lock(&self.history).clone();
        contents.push(user.clone());

        let response = self
            .client
            .post(&self.url)
            .json(&GenerateContentRequest { contents })
            .send()
            .await
            .map_err(|err| SynthError::Stream {
                status_code: None,
                message: format!("Gemini API request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }
        tracing::debug!("Gemini stream opened");

        let bytes = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map(|bytes| bytes.to_vec()).map_err(|err| SynthError::Stream {
                    status_code: None,
                    message: format!("Gemini stream interrupted: {err}"),
                    is_retryable: err.is_timeout(),
                })
            })
            .boxed();

        Ok(delta_stream(bytes, user, Arc::clone(&self.history)))
    }

    fn history(&self) -> Vec<ConversationTurn> {
        lock(&self.history).iter().map(ConversationTurn::from).collect()
    }
}

fn lock(history: &Mutex<Vec<Content>>) -> MutexGuard<'_, Vec<Content>> {
    history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Delta stream
// ============================================================================

enum Phase {
    Reading,
    Failed(SynthError),
    Drained,
    Done,
}

struct StreamState {
    bytes: BoxStream<'static, Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    reply: String,
    user: Content,
    history: Arc<Mutex<Vec<Content>>>,
    phase: Phase,
}

impl StreamState {
    /// Decodes events from `payloads`, queueing text and stopping at the first error.
    fn accept(&mut self, payloads: Vec<String>) {
        for payload in payloads {
            match parse_event(&payload) {
                Ok(Some(text)) => {
                    self.reply.push_str(&text);
                    self.pending.push_back(text);
                }
                Ok(None) => {}
                Err(err) => {
                    self.phase = Phase::Failed(err);
                    return;
                }
            }
        }
    }

    /// Records the finished exchange in the conversation history.
    fn commit(&mut self) {
        if self.reply.is_empty() {
            tracing::warn!("Gemini stream finished without text; history left unchanged");
            return;
        }
        let mut history = lock(&self.history);
        history.push(self.user.clone());
        history.push(Content::text("model", std::mem::take(&mut self.reply)));
    }
}

/// Adapts raw response bytes into text deltas.
///
/// Deltas decoded before a failure are yielded first, then the error once.
/// History is only touched after the last delta has been handed out.
fn delta_stream(
    bytes: BoxStream<'static, Result<Vec<u8>>>,
    user: Content,
    history: Arc<Mutex<Vec<Content>>>,
) -> DeltaStream {
    let state = StreamState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        reply: String::new(),
        user,
        history,
        phase: Phase::Reading,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(delta), state));
            }
            match std::mem::replace(&mut state.phase, Phase::Done) {
                Phase::Done => return None,
                Phase::Failed(err) => return Some((Err(err), state)),
                Phase::Drained => {
                    state.commit();
                    return None;
                }
                Phase::Reading => {
                    state.phase = Phase::Reading;
                    match state.bytes.next().await {
                        Some(Ok(chunk)) => {
                            let payloads = state.decoder.push(&chunk);
                            state.accept(payloads);
                        }
                        Some(Err(err)) => state.phase = Phase::Failed(err),
                        None => {
                            let rest = state.decoder.finish();
                            state.phase = Phase::Drained;
                            state.accept(rest.into_iter().collect());
                        }
                    }
                }
            }
        }
    })
    .boxed()
}

/// Incremental `text/event-stream` line decoder yielding `data:` payloads.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds raw bytes and returns the payloads of every completed `data:` line.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(payload) = data_payload(&line[..newline]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a final line that arrived without a trailing newline.
    fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches('\r');
    let payload = line.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    Some(payload.to_string())
}

/// Text carried by one streamed response chunk, if any.
fn parse_event(payload: &str) -> Result<Option<String>> {
    if let Ok(wrapper) = serde_json::from_str::<ErrorWrapper>(payload) {
        return Err(SynthError::Stream {
            status_code: wrapper.error.code.and_then(|code| u16::try_from(code).ok()),
            message: describe_error(wrapper.error, payload),
            is_retryable: false,
        });
    }

    let chunk: GenerateContentResponse =
        serde_json::from_str(payload).map_err(|err| SynthError::Stream {
            status_code: None,
            message: format!("Failed to parse Gemini stream chunk: {err}"),
            is_retryable: false,
        })?;

    let text: String = chunk
        .candidates
        .into_iter()
        .flatten()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

impl From<&ConversationTurn> for Content {
    fn from(turn: &ConversationTurn) -> Self {
        Self::text(turn.role.as_str(), turn.text.clone())
    }
}

impl From<&Content> for ConversationTurn {
    fn from(content: &Content) -> Self {
        let role = match content.role.as_str() {
            "model" => MessageRole::Model,
            _ => MessageRole::User,
        };
        Self {
            role,
            text: content.parts.iter().map(|part| part.text.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

fn describe_error(error: ErrorBody, raw: &str) -> String {
    let status_text = error.status.unwrap_or_default();
    let msg = error.message.unwrap_or_else(|| raw.to_string());
    if status_text.is_empty() {
        msg
    } else {
        format!("{status_text}: {msg}")
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> SynthError {
    let mut message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| describe_error(wrapper.error, &body))
        .unwrap_or_else(|_| body.clone());
    if message.trim().is_empty() {
        message = format!("Gemini API returned HTTP {}", status.as_u16());
    }
    if let Some(delay) = retry_after {
        message.push_str(&format!(" (retry after {}s)", delay.as_secs()));
    }

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    SynthError::Stream {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"role\":\"model\",\"parts\":[{{\"text\":{}}}]}}}}]}}\r\n\r\n",
            serde_json::to_string(text).unwrap()
        )
    }

    fn byte_stream(chunks: Vec<Result<Vec<u8>>>) -> BoxStream<'static, Result<Vec<u8>>> {
        stream::iter(chunks).boxed()
    }

    #[test]
    fn test_blank_api_key_is_config_error() {
        assert!(GeminiModelService::new("  ").unwrap_err().is_config());
        assert!(GeminiModelService::new("key").is_ok());
    }

    #[test]
    fn test_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert_eq!(decoder.push(b":1}\r\n\r\ndata: [DONE]\n"), vec!["{\"a\":1}"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decoder_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\ndata:{}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("{}"));
    }

    #[test]
    fn test_parse_event_joins_parts() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        assert_eq!(parse_event(payload).unwrap().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_parse_event_without_text() {
        let payload = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(parse_event(payload).unwrap(), None);
    }

    #[test]
    fn test_parse_event_error_payload() {
        let payload = r#"{"error":{"code":500,"message":"boom","status":"INTERNAL"}}"#;
        let err = parse_event(payload).unwrap_err();
        assert_eq!(err.to_string(), "INTERNAL: boom");
    }

    #[test]
    fn test_map_http_error_retryability() {
        let body = r#"{"error":{"code":429,"message":"slow down","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            body.to_string(),
            Some(Duration::from_secs(7)),
        );
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "RESOURCE_EXHAUSTED: slow down (retry after 7s)");

        let err = map_http_error(StatusCode::BAD_REQUEST, "bad".to_string(), None);
        assert!(!err.is_retryable());
        assert!(matches!(err, SynthError::Stream { status_code: Some(400), .. }));
    }

    #[tokio::test]
    async fn test_completed_stream_commits_history() {
        let history = Arc::new(Mutex::new(Vec::new()));
        let body = format!("{}{}", chunk("Hello, "), chunk("world"));
        let bytes = byte_stream(vec![
            Ok(body.as_bytes()[..10].to_vec()),
            Ok(body.as_bytes()[10..].to_vec()),
        ]);

        let deltas: Vec<String> = delta_stream(bytes, Content::text("user", "hi"), history.clone())
            .map(|delta| delta.unwrap())
            .collect()
            .await;

        assert_eq!(deltas, vec!["Hello, ", "world"]);
        let history = lock(&history);
        assert_eq!(history.len(), 2);
        assert_eq!(ConversationTurn::from(&history[1]).text, "Hello, world");
    }

    #[tokio::test]
    async fn test_failed_stream_yields_partial_then_error_without_commit() {
        let history = Arc::new(Mutex::new(Vec::new()));
        let bytes = byte_stream(vec![
            Ok(chunk("partial").into_bytes()),
            Err(SynthError::stream("reset")),
        ]);

        let items: Vec<Result<String>> =
            delta_stream(bytes, Content::text("user", "hi"), history.clone())
                .collect()
                .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "partial");
        assert!(items[1].as_ref().unwrap_err().is_stream());
        assert!(lock(&history).is_empty());
    }

    #[test]
    fn test_conversation_seeds_history_without_empty_turns() {
        let service = GeminiModelService::new("key").unwrap();
        let conversation = service.create_conversation(
            DEFAULT_GEMINI_MODEL,
            vec![
                ConversationTurn { role: MessageRole::User, text: "q".into() },
                ConversationTurn { role: MessageRole::Model, text: String::new() },
                ConversationTurn { role: MessageRole::Model, text: "a".into() },
            ],
        );
        let history = conversation.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, MessageRole::Model);
    }
}
