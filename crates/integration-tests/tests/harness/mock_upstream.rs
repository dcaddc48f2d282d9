//! Mock provider backend for integration tests
//!
//! Serves the three upstream dialects from one listener: OpenAI-compatible
//! SSE on `/v1/chat/completions`, Ollama NDJSON on `/api/chat`, and Anthropic
//! SSE on `/v1/messages`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::stream;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const CREATED: u64 = 1_700_000_000;

/// Mock backend with predictable responses
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    request_count: AtomicU32,
    /// Number of requests to fail before succeeding (`u32::MAX` = always)
    fail_count: AtomicU32,
    /// Words streamed back, one frame each
    words: Vec<String>,
    /// Delay before the response headers
    stall: Option<Duration>,
    /// Delay between stream frames
    frame_delay: Duration,
    /// Streaming bodies not yet dropped by the server
    open_bodies: Arc<AtomicU32>,
    last_request: Mutex<Option<Value>>,
    last_headers: Mutex<HeaderMap>,
}

/// Counts a streaming body as open until the server drops it
struct OpenBody(Arc<AtomicU32>);

impl OpenBody {
    fn new(counter: &Arc<AtomicU32>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for OpenBody {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockUpstream {
    /// Start a mock answering "Hello from mock"
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(MockState::new("Hello from mock")).await
    }

    /// Start a mock answering with custom content
    pub async fn start_with_response(content: &str) -> anyhow::Result<Self> {
        Self::start_inner(MockState::new(content)).await
    }

    /// Start a mock that fails the first `n` requests with 500
    pub async fn start_failing(n: u32) -> anyhow::Result<Self> {
        let state = MockState::new("Hello from mock");
        state.fail_count.store(n, Ordering::Relaxed);
        Self::start_inner(state).await
    }

    /// Start a mock that fails every request with 500
    pub async fn start_always_failing() -> anyhow::Result<Self> {
        Self::start_failing(u32::MAX).await
    }

    /// Start a mock that waits `delay` before answering
    pub async fn start_stalled(delay: Duration) -> anyhow::Result<Self> {
        let mut state = MockState::new("Hello from mock");
        state.stall = Some(delay);
        Self::start_inner(state).await
    }

    /// Start a mock that streams `frames` words with `delay` between them
    pub async fn start_slow(frames: usize, delay: Duration) -> anyhow::Result<Self> {
        let content = (0..frames).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let mut state = MockState::new(&content);
        state.frame_delay = delay;
        Self::start_inner(state).await
    }

    async fn start_inner(state: MockState) -> anyhow::Result<Self> {
        let state = Arc::new(state);

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_openai))
            .route("/api/chat", routing::post(handle_ollama))
            .route("/v1/messages", routing::post(handle_anthropic))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for OpenAI-compatible providers (forge, openai, n2)
    pub fn openai_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for Ollama
    pub fn ollama_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL for Anthropic
    pub fn anthropic_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of chat requests received on any route
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// Number of streaming responses still being served
    pub fn open_streams(&self) -> u32 {
        self.state.open_bodies.load(Ordering::SeqCst)
    }

    /// Wait until every streaming response has been dropped, or `limit` elapses
    pub async fn wait_for_closed_streams(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while self.open_streams() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Body of the most recent request
    pub fn last_request(&self) -> Option<Value> {
        self.state.last_request.lock().unwrap().clone()
    }

    /// Value of a header on the most recent request
    pub fn last_header(&self, name: &str) -> Option<String> {
        self.state
            .last_headers
            .lock()
            .unwrap()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl MockState {
    fn new(content: &str) -> Self {
        Self {
            request_count: AtomicU32::new(0),
            fail_count: AtomicU32::new(0),
            words: content.split_whitespace().map(str::to_owned).collect(),
            stall: None,
            frame_delay: Duration::ZERO,
            open_bodies: Arc::new(AtomicU32::new(0)),
            last_request: Mutex::new(None),
            last_headers: Mutex::new(HeaderMap::new()),
        }
    }

    /// Record the request and decide whether it should fail
    async fn accept(&self, headers: HeaderMap, body: &Value) -> Option<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(body.clone());
        *self.last_headers.lock().unwrap() = headers;

        let remaining = self.fail_count.load(Ordering::Relaxed);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.fail_count.fetch_sub(1, Ordering::Relaxed);
            }
            let failure = (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"message": "mock server intentional failure", "type": "server_error"}})),
            );
            return Some(failure.into_response());
        }

        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }

        None
    }

    fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Stream `frames` with the configured delay before each one
    ///
    /// The body counts as open until hyper drops it, either after the last
    /// frame or when the client goes away.
    fn stream(&self, content_type: &'static str, frames: Vec<String>) -> Response {
        let delay = self.frame_delay;
        let open = OpenBody::new(&self.open_bodies);
        let frames = stream::unfold((frames.into_iter(), open), move |(mut frames, open)| async move {
            let frame = frames.next()?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Some((Ok::<_, Infallible>(frame), (frames, open)))
        });

        ([(header::CONTENT_TYPE, content_type)], Body::from_stream(frames)).into_response()
    }

    /// Fragments as streamed, each word followed by a space except the last
    fn fragments(&self) -> impl Iterator<Item = String> + '_ {
        let last = self.words.len().saturating_sub(1);
        self.words
            .iter()
            .enumerate()
            .map(move |(i, word)| if i == last { word.clone() } else { format!("{word} ") })
    }
}

fn is_streaming(body: &Value) -> bool {
    body["stream"].as_bool().unwrap_or(false)
}

fn model_of(body: &Value) -> String {
    body["model"].as_str().unwrap_or("mock-model").to_owned()
}

// -- OpenAI-compatible --

async fn handle_openai(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(failure) = state.accept(headers, &body).await {
        return failure;
    }

    let model = model_of(&body);

    if !is_streaming(&body) {
        return Json(json!({
            "id": "chatcmpl-test-123",
            "object": "chat.completion",
            "created": CREATED,
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": state.text()},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))
        .into_response();
    }

    let chunk = |delta: Value, finish: Option<&str>| {
        let chunk = json!({
            "id": "chatcmpl-test-stream",
            "object": "chat.completion.chunk",
            "created": CREATED,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish}]
        });
        format!("data: {chunk}\n\n")
    };

    let mut frames = vec![chunk(json!({"role": "assistant", "content": ""}), None)];
    frames.extend(state.fragments().map(|text| chunk(json!({"content": text}), None)));
    frames.push(chunk(json!({}), Some("stop")));
    frames.push(format!(
        "data: {}\n\n",
        json!({
            "id": "chatcmpl-test-stream",
            "object": "chat.completion.chunk",
            "created": CREATED,
            "model": model,
            "choices": [],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
    ));
    frames.push("data: [DONE]\n\n".to_owned());

    state.stream("text/event-stream", frames)
}

// -- Ollama --

async fn handle_ollama(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(failure) = state.accept(headers, &body).await {
        return failure;
    }

    let model = model_of(&body);

    if !is_streaming(&body) {
        return Json(json!({
            "model": model,
            "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": state.text()},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 10,
            "eval_count": 5
        }))
        .into_response();
    }

    let mut frames: Vec<String> = state
        .fragments()
        .map(|text| {
            let line = json!({
                "model": model,
                "created_at": "2024-01-01T00:00:00Z",
                "message": {"role": "assistant", "content": text},
                "done": false
            });
            format!("{line}\n")
        })
        .collect();

    let last = json!({
        "model": model,
        "created_at": "2024-01-01T00:00:00Z",
        "message": {"role": "assistant", "content": ""},
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 10,
        "eval_count": 5
    });
    frames.push(format!("{last}\n"));

    state.stream("application/x-ndjson", frames)
}

// -- Anthropic --

async fn handle_anthropic(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(failure) = state.accept(headers, &body).await {
        return failure;
    }

    let model = model_of(&body);

    if !is_streaming(&body) {
        return Json(json!({
            "id": "msg_test_123",
            "type": "message",
            "role": "assistant",
            "model": model,
            "content": [{"type": "text", "text": state.text()}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))
        .into_response();
    }

    let event = |name: &str, data: Value| format!("event: {name}\ndata: {data}\n\n");

    let mut frames = vec![
        event(
            "message_start",
            json!({
                "type": "message_start",
                "message": {"id": "msg_test_stream", "model": model, "usage": {"input_tokens": 10, "output_tokens": 1}}
            }),
        ),
        event(
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        ),
    ];
    frames.extend(state.fragments().map(|text| {
        event(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": text}}),
        )
    }));
    frames.push(event("content_block_stop", json!({"type": "content_block_stop", "index": 0})));
    frames.push(event(
        "message_delta",
        json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 5}}),
    ));
    frames.push(event("message_stop", json!({"type": "message_stop"})));

    state.stream("text/event-stream", frames)
}
