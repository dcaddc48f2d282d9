//! Chat routes: streaming SSE, non-streaming completion, cancellation

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};
use http::header::{CACHE_CONTROL, HeaderName, HeaderValue};
use http::StatusCode;
use serde::Deserialize;
use switchboard_core::ChatMessage;
use switchboard_llm::{ChatStream, GatewayConfig, StreamEvent};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");
const X_CONVERSATION_ID: HeaderName = HeaderName::from_static("x-conversation-id");

/// Body of the chat routes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<u64>,
}

/// Everything a call needs, resolved from the request and current settings
struct PreparedCall {
    conversation_id: u64,
    config: GatewayConfig,
    messages: Vec<ChatMessage>,
    user_message: ChatMessage,
}

async fn prepare(state: &AppState, request: ChatRequest) -> Result<PreparedCall, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let conversation_id = match request.conversation_id {
        Some(id) => id,
        None => state
            .store
            .next_conversation_id()
            .await
            .map_err(|e| ApiError::internal(&e))?,
    };

    let history = state
        .store
        .history(conversation_id)
        .await
        .map_err(|e| ApiError::internal(&e))?;

    let settings = state.settings.read().await.clone();
    let user_message = ChatMessage::user(request.message);

    let mut messages = Vec::with_capacity(history.len() + 2);
    if let Some(prompt) = settings.system_prompt.as_deref() {
        messages.push(ChatMessage::system(prompt));
    }
    messages.extend(history);
    messages.push(user_message.clone());

    Ok(PreparedCall {
        conversation_id,
        config: GatewayConfig::from_settings(&settings),
        messages,
        user_message,
    })
}

/// Handle `POST /api/chat`
pub async fn chat_stream(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let call = match prepare(&state, request).await {
        Ok(call) => call,
        Err(e) => return e.into_response(),
    };

    let conversation_id = call.conversation_id;
    tracing::debug!(conversation_id, provider = %call.config.provider, "starting chat stream");

    let stream = state.gateway.stream(call.config, call.messages);
    let stream_id = state.inflight.register(conversation_id, stream.cancel_token());

    let relay = Relay {
        stream,
        state,
        conversation_id,
        stream_id,
        user_message: Some(call.user_message),
        reply: String::new(),
    };

    let mut response = Sse::new(sse_events(relay))
        .keep_alive(KeepAlive::default())
        .into_response();

    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    headers.insert(X_CONVERSATION_ID, HeaderValue::from(conversation_id));

    response
}

/// Handle `POST /api/chat/complete`
pub async fn chat_complete(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let call = match prepare(&state, request).await {
        Ok(call) => call,
        Err(e) => return e.into_response(),
    };

    match state.gateway.complete(&call.config, &call.messages).await {
        Ok(response) => {
            let turns = vec![call.user_message, ChatMessage::assistant(response.text())];
            if let Err(e) = state.store.append(call.conversation_id, turns).await {
                tracing::warn!(conversation_id = call.conversation_id, error = %e, "failed to store conversation turns");
            }

            let mut http_response = Json(response).into_response();
            http_response
                .headers_mut()
                .insert(X_CONVERSATION_ID, HeaderValue::from(call.conversation_id));
            http_response
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Handle `DELETE /api/chat/{conversation_id}`
pub async fn chat_cancel(State(state): State<AppState>, Path(conversation_id): Path<u64>) -> StatusCode {
    if state.inflight.cancel(conversation_id) {
        tracing::debug!(conversation_id, "chat stream cancelled");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Forwards gateway events to the client and stores the finished turns
///
/// Dropping the relay, which happens when the client disconnects, drops the
/// gateway stream and so cancels the upstream call.
struct Relay {
    stream: ChatStream,
    state: AppState,
    conversation_id: u64,
    stream_id: Uuid,
    user_message: Option<ChatMessage>,
    reply: String,
}

impl Relay {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        let event = self.stream.next().await?;

        match &event {
            StreamEvent::Content(text) => self.reply.push_str(text),
            StreamEvent::Done { .. } => self.persist().await,
            StreamEvent::Info { .. } | StreamEvent::Error(_) => {}
        }

        Some(event)
    }

    async fn persist(&mut self) {
        let Some(user_message) = self.user_message.take() else {
            return;
        };

        let reply = ChatMessage::assistant(std::mem::take(&mut self.reply));
        if let Err(e) = self
            .state
            .store
            .append(self.conversation_id, vec![user_message, reply])
            .await
        {
            tracing::warn!(conversation_id = self.conversation_id, error = %e, "failed to store conversation turns");
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.state.inflight.release(self.conversation_id, self.stream_id);
    }
}

fn sse_events(relay: Relay) -> impl Stream<Item = Result<Event, axum::Error>> {
    futures_util::stream::unfold(relay, |mut relay| async move {
        let event = relay.next_event().await?;
        Some((Event::default().json_data(&event), relay))
    })
}
