use http::StatusCode;

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by the gateway and settings error types. The server layer
/// turns these into JSON error bodies, keeping domain errors decoupled
/// from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `configuration_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String {
        self.to_string()
    }
}
