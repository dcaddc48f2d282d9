//! HTTP plumbing shared by streaming and non-streaming calls

use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use switchboard_core::Provider;

use crate::convert::RequestBody;
use crate::error::GatewayError;
use crate::registry::{self, Dialect, ProviderDescriptor};
use crate::types::GatewayConfig;

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Upper bound on the error body echoed into error messages
const MAX_ERROR_BODY: usize = 512;

/// Resolved endpoint and credentials of one attempt
#[derive(Debug)]
pub(crate) struct Target {
    pub(crate) descriptor: &'static ProviderDescriptor,
    pub(crate) endpoint: String,
    api_key: Option<SecretString>,
}

impl Target {
    /// Resolve the endpoint for a configuration
    pub(crate) fn resolve(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let descriptor = registry::resolve(config.provider);
        let base_url = descriptor.base_url(config.api_url.as_ref())?;
        let base = base_url.as_str().trim_end_matches('/');

        let endpoint = match descriptor.dialect {
            Dialect::OpenAiCompatible => format!("{base}/chat/completions"),
            Dialect::OllamaNative => format!("{base}/api/chat"),
            Dialect::AnthropicNative => format!("{base}/messages"),
        };

        Ok(Self {
            descriptor,
            endpoint,
            api_key: config.api_key().cloned(),
        })
    }

    pub(crate) const fn provider(&self) -> Provider {
        self.descriptor.provider
    }

    fn request(&self, client: &Client, body: &RequestBody) -> RequestBuilder {
        let builder = client.post(&self.endpoint).json(body);

        let Some(key) = &self.api_key else {
            return builder;
        };

        match self.descriptor.dialect {
            Dialect::AnthropicNative => builder
                .header("x-api-key", key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION),
            Dialect::OpenAiCompatible | Dialect::OllamaNative => builder.bearer_auth(key.expose_secret()),
        }
    }

    /// Send the request and reject non-success statuses
    pub(crate) async fn send(&self, client: &Client, body: &RequestBody) -> Result<Response, GatewayError> {
        let provider = self.provider();

        let response = self.request(client, body).send().await.map_err(|e| {
            tracing::error!(provider = %provider, error = %e, "upstream request failed");
            GatewayError::transport(provider, &e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);

        tracing::warn!(provider = %provider, status = %status, "upstream returned error");

        Err(GatewayError::Status { provider, status, body })
    }
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    #[test]
    fn endpoints_per_dialect() {
        let forge = Target::resolve(&GatewayConfig::new(Provider::Forge)).unwrap();
        assert_eq!(forge.endpoint, "http://127.0.0.1:4000/v1/chat/completions");

        let ollama = Target::resolve(&GatewayConfig::new(Provider::Ollama)).unwrap();
        assert_eq!(ollama.endpoint, "http://127.0.0.1:11434/api/chat");

        let anthropic = Target::resolve(&GatewayConfig::new(Provider::Anthropic)).unwrap();
        assert_eq!(anthropic.endpoint, "https://api.anthropic.com/v1/messages");

        let mut n2 = GatewayConfig::new(Provider::N2);
        n2.api_url = Some(Url::parse("http://n2.lan:8000/v1/").unwrap());
        assert_eq!(Target::resolve(&n2).unwrap().endpoint, "http://n2.lan:8000/v1/chat/completions");
    }

    #[test]
    fn n2_without_url_is_config_error() {
        let err = Target::resolve(&GatewayConfig::new(Provider::N2)).unwrap_err();
        assert!(matches!(err, GatewayError::MissingUrl { .. }));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut text = "é".repeat(300);
        truncate_at_char_boundary(&mut text, 513);
        assert_eq!(text.len(), 512);

        let mut short = "short".to_owned();
        truncate_at_char_boundary(&mut short, 512);
        assert_eq!(short, "short");
    }
}
