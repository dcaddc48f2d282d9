//! Provider-agnostic shapes exchanged with callers
//!
//! Every dialect converts into these types, so callers of the gateway never
//! handle the wire formats in [`crate::protocol`].

pub mod config;
pub mod response;
pub mod stream;

pub use config::{GatewayConfig, ProviderCredentials};
pub use response::{Choice, ChoiceMessage, UnifiedResponse, Usage};
pub use stream::StreamEvent;
