use http::Method;
use http::header::HeaderName;
use switchboard_config::CorsConfig;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Methods used by the dashboard frontend
const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Header the frontend reads to learn the conversation id of a new chat
const EXPOSED_HEADERS: [HeaderName; 1] = [HeaderName::from_static("x-conversation-id")];

/// Build a Tower CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new()
        .allow_methods(METHODS)
        .expose_headers(EXPOSED_HEADERS);

    layer = if config.origins.is_any() {
        layer.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<_> = config
            .origins
            .values()
            .into_iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    };

    layer = if config.headers.is_any() {
        layer.allow_headers(AllowHeaders::any())
    } else {
        let headers: Vec<HeaderName> = config
            .headers
            .values()
            .into_iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer.allow_headers(headers)
    };

    if config.credentials {
        layer = layer.allow_credentials(true);
    }

    if let Some(duration) = config.max_age_duration() {
        layer = layer.max_age(duration);
    }

    layer
}
