//! Shared domain primitives for Switchboard
//!
//! Types used by both the configuration layer and the gateway: the closed
//! provider enumeration, conversation messages, and the error-to-HTTP seam.

#![allow(clippy::must_use_candidate)]

mod error;
mod message;
mod provider;

pub use error::HttpError;
pub use message::{ChatMessage, Role};
pub use provider::{MASKED_API_KEY, Provider, is_masked_key};
