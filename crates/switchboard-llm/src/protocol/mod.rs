//! Wire format types for provider-specific API protocols
//!
//! Each module contains serde structs matching one dialect's JSON. Response
//! types default every field so that sparse upstream payloads still parse.

pub mod anthropic;
pub mod ollama;
pub mod openai;
