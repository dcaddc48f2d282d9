//! Call orchestration: provider selection, one fallback hop, deadline and
//! cancellation

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use reqwest::Client;
use switchboard_core::{ChatMessage, Provider};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::convert::{RequestBody, translate_request, translate_response};
use crate::decode::{self, Decoded, StreamDecoder};
use crate::error::GatewayError;
use crate::types::{GatewayConfig, StreamEvent, UnifiedResponse, Usage};
use crate::upstream::Target;

/// Events buffered between the upstream driver and the consumer
const EVENT_BUFFER: usize = 64;

/// Entry point for chat calls
///
/// Holds only a connection pool; every call receives its own immutable
/// [`GatewayConfig`].
#[derive(Debug, Clone, Default)]
pub struct Gateway {
    client: Client,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Start a streaming call
    ///
    /// The call runs on a spawned task and must be started from within a
    /// Tokio runtime. Dropping the returned [`ChatStream`] or calling
    /// [`ChatStream::cancel`] aborts the upstream request without emitting an
    /// error.
    pub fn stream(&self, config: GatewayConfig, messages: Vec<ChatMessage>) -> ChatStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let driver = Driver {
            client: self.client.clone(),
            emitter: Emitter::new(tx),
        };
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::debug!(provider = %config.provider, "stream cancelled by caller");
                }
                () = driver.run(&config, &messages) => {}
            }
        });

        ChatStream { events: rx, cancel }
    }

    /// Perform a non-streaming call with the same fallback and deadline policy
    ///
    /// Dropping the returned future cancels the upstream request.
    pub async fn complete(
        &self,
        config: &GatewayConfig,
        messages: &[ChatMessage],
    ) -> Result<UnifiedResponse, GatewayError> {
        let error = match self.complete_once(config, messages).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        match fallback_for(config, &error) {
            Some(fallback) => self.complete_once(&fallback, messages).await,
            None => Err(error),
        }
    }

    async fn complete_once(
        &self,
        config: &GatewayConfig,
        messages: &[ChatMessage],
    ) -> Result<UnifiedResponse, GatewayError> {
        let target = Target::resolve(config)?;
        let body = translate_request(config, messages, false)?;

        let response = with_deadline(config, fetch_complete(&self.client, &target, &body)).await?;
        tracing::debug!(provider = %config.provider, usage = ?response.usage, "completion finished");

        Ok(response)
    }
}

/// Fallback configuration to use after `error`, if the policy allows one
fn fallback_for(config: &GatewayConfig, error: &GatewayError) -> Option<GatewayConfig> {
    if !error.triggers_fallback() {
        return None;
    }

    let fallback = config.fallback_config()?;

    tracing::warn!(
        from_provider = %config.provider,
        to_provider = %fallback.provider,
        error = %error,
        "provider failed, retrying against fallback provider"
    );

    Some(fallback)
}

async fn with_deadline<T>(
    config: &GatewayConfig,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    if let Ok(result) = tokio::time::timeout(config.timeout, call).await {
        return result;
    }

    let ms = config.timeout_ms();
    tracing::warn!(provider = %config.provider, timeout_ms = ms, "upstream call timed out");

    Err(GatewayError::Timeout {
        provider: config.provider,
        ms,
    })
}

async fn fetch_complete(client: &Client, target: &Target, body: &RequestBody) -> Result<UnifiedResponse, GatewayError> {
    let provider = target.provider();
    let response = target.send(client, body).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| GatewayError::transport(provider, &e))?;

    translate_response(provider, &bytes)
}

/// Drives one streaming call on its own task
struct Driver {
    client: Client,
    emitter: Emitter,
}

impl Driver {
    async fn run(mut self, config: &GatewayConfig, messages: &[ChatMessage]) {
        let error = match self.attempt(config, messages).await {
            Ok(usage) => return self.emitter.done(usage).await,
            Err(error) => error,
        };

        // Content already reached the caller, a second provider would repeat it
        let fallback = if self.emitter.content_sent {
            None
        } else {
            fallback_for(config, &error)
        };

        let error = match fallback {
            Some(fallback) => match self.attempt(&fallback, messages).await {
                Ok(usage) => return self.emitter.done(usage).await,
                Err(error) => error,
            },
            None => error,
        };

        // The failing attempt reached the provider, so name it before the error
        self.emitter.flush_info().await;
        self.emitter.error(&error).await;
    }

    async fn attempt(&mut self, config: &GatewayConfig, messages: &[ChatMessage]) -> Result<Option<Usage>, GatewayError> {
        self.emitter.pending_info = None;
        let target = Target::resolve(config)?;
        let body = translate_request(config, messages, config.stream_enabled)?;

        let model = target.descriptor.model_or_default(&config.model).to_owned();
        self.emitter.announce(config.provider, model);

        if config.stream_enabled {
            with_deadline(config, self.relay(&target, &body)).await
        } else {
            let response = with_deadline(config, fetch_complete(&self.client, &target, &body)).await?;
            let usage = response.usage;
            if let Some(choice) = response.choices.into_iter().next() {
                self.emitter.content(choice.message.content).await;
            }
            Ok(Some(usage))
        }
    }

    /// Forward decoded upstream frames until the stream terminates
    async fn relay(&mut self, target: &Target, body: &RequestBody) -> Result<Option<Usage>, GatewayError> {
        let provider = target.provider();
        let response = target.send(&self.client, body).await?;

        let dialect = target.descriptor.dialect;
        let mut frames = decode::frames(dialect, response.bytes_stream());
        let mut decoder = StreamDecoder::new(dialect);

        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(|message| {
                tracing::error!(provider = %provider, error = %message, "upstream stream interrupted");
                GatewayError::Transport { provider, message }
            })?;

            for item in decoder.feed(&frame) {
                if let Some(outcome) = self.deliver(provider, item).await {
                    return outcome;
                }
            }
        }

        match decoder.finish() {
            Ok(Some(item)) => self.deliver(provider, item).await.unwrap_or(Ok(None)),
            Ok(None) => Ok(None),
            Err(message) => Err(GatewayError::Decode { provider, message }),
        }
    }

    async fn deliver(&mut self, provider: Provider, item: Decoded) -> Option<Result<Option<Usage>, GatewayError>> {
        match item {
            Decoded::Content(text) => {
                self.emitter.content(text).await;
                None
            }
            Decoded::Done(usage) => Some(Ok(usage)),
            Decoded::Failed(message) => Some(Err(GatewayError::Upstream { provider, message })),
        }
    }
}

/// Enforces event ordering on the channel
///
/// `info` is held back until the first content, completion or final error of
/// an attempt that issued its request, so it names the provider that actually
/// answered. Attempts that fail before sending anything produce no `info`.
struct Emitter {
    tx: mpsc::Sender<StreamEvent>,
    pending_info: Option<StreamEvent>,
    info_sent: bool,
    content_sent: bool,
}

impl Emitter {
    const fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            pending_info: None,
            info_sent: false,
            content_sent: false,
        }
    }

    fn announce(&mut self, provider: Provider, model: String) {
        if !self.info_sent {
            self.pending_info = Some(StreamEvent::Info {
                provider,
                model: Some(model),
            });
        }
    }

    async fn content(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.flush_info().await;
        self.content_sent = true;
        self.send(StreamEvent::Content(text)).await;
    }

    async fn done(&mut self, usage: Option<Usage>) {
        self.flush_info().await;
        tracing::debug!(usage = ?usage, "stream completed");
        self.send(StreamEvent::Done { usage }).await;
    }

    async fn error(&mut self, error: &GatewayError) {
        tracing::debug!(error = %error, "stream failed");
        self.send(StreamEvent::Error(error.to_string())).await;
    }

    async fn flush_info(&mut self) {
        if let Some(info) = self.pending_info.take() {
            self.info_sent = true;
            self.send(info).await;
        }
    }

    async fn send(&self, event: StreamEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("stream consumer went away");
        }
    }
}

/// Event stream of one call
///
/// Yields nothing further once cancelled. Dropping the stream cancels the
/// call.
#[derive(Debug)]
pub struct ChatStream {
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
}

impl ChatStream {
    /// Abort the call; no error event is produced
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this call, for registries of in-flight streams
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for ChatStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        self.events.poll_recv(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
