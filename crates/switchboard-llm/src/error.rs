use http::StatusCode;
use switchboard_core::{HttpError, Provider};
use thiserror::Error;

/// Failure taxonomy of a gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown provider or missing required URL, never retried
    Config,
    /// Required credential absent
    Auth,
    /// Network failure, non-2xx status, timeout, or upstream-reported error
    Transport,
    /// Response body or stream could not be decoded
    Decode,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config_error",
            Self::Auth => "auth_error",
            Self::Transport => "transport_error",
            Self::Decode => "decode_error",
        }
    }
}

/// Errors produced by a gateway call
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid configuration detected while preparing the call
    #[error("invalid gateway configuration: {0}")]
    Config(String),

    /// Provider name outside the registry
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider has no default base URL and none was configured
    #[error("provider {provider} requires an explicit api url")]
    MissingUrl { provider: Provider },

    /// Provider requires an API key and none was configured
    #[error("provider {provider} requires an api key")]
    Auth { provider: Provider },

    /// Request could not be sent or the body could not be read
    #[error("request to {provider} failed: {message}")]
    Transport { provider: Provider, message: String },

    /// Upstream answered with a non-success status
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: Provider,
        status: StatusCode,
        body: String,
    },

    /// Deadline elapsed before the call finished
    #[error("{provider} did not finish within {ms} ms")]
    Timeout { provider: Provider, ms: u64 },

    /// Response could not be decoded into the unified shape
    #[error("undecodable response from {provider}: {message}")]
    Decode { provider: Provider, message: String },

    /// Upstream reported a failure inside an otherwise successful response
    #[error("{provider} reported an error: {message}")]
    Upstream { provider: Provider, message: String },
}

impl GatewayError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::UnknownProvider(_) | Self::MissingUrl { .. } => ErrorKind::Config,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Transport { .. } | Self::Status { .. } | Self::Timeout { .. } | Self::Upstream { .. } => {
                ErrorKind::Transport
            }
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Whether a configured fallback provider may be tried after this error
    ///
    /// Configuration errors are deterministic and would fail the same way on
    /// the next call, so only those are excluded.
    pub const fn triggers_fallback(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Config)
    }

    pub(crate) fn transport(provider: Provider, error: &reqwest::Error) -> Self {
        Self::Transport {
            provider,
            message: error.to_string(),
        }
    }
}

impl HttpError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::UnknownProvider(_) | Self::MissingUrl { .. } => StatusCode::BAD_REQUEST,
            Self::Auth { .. } => StatusCode::UNAUTHORIZED,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport { .. } | Self::Status { .. } | Self::Decode { .. } | Self::Upstream { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn error_type(&self) -> &str {
        self.kind().as_str()
    }
}
