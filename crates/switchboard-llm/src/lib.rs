//! LLM provider gateway for Switchboard
//!
//! Accepts a unified chat request, routes it to one of five backends (forge,
//! ollama, openai, anthropic, n2), translates request and response shapes,
//! decodes three streaming formats into one event stream, and retries once
//! against a fallback provider on failure.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod decode;
pub mod error;
mod gateway;
pub mod protocol;
pub mod registry;
pub mod types;
mod upstream;

pub use error::{ErrorKind, GatewayError};
pub use gateway::{ChatStream, Gateway};
pub use registry::{Dialect, ProviderDescriptor};
pub use types::{GatewayConfig, ProviderCredentials, StreamEvent, UnifiedResponse, Usage};
