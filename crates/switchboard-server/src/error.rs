use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use switchboard_core::HttpError;

/// JSON error response in the OpenAI error shape
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_type: String,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error_type: "invalid_request_error".to_owned(),
            message: message.into(),
        }
    }

    pub fn internal(error: &anyhow::Error) -> Self {
        tracing::error!(error = %error, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error_type: "internal_error".to_owned(),
            message: "an internal error occurred".to_owned(),
        }
    }
}

impl<E: HttpError> From<E> for ApiError {
    fn from(error: E) -> Self {
        Self {
            status: error.status_code(),
            error_type: error.error_type().to_owned(),
            message: error.client_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message,
                "type": self.error_type,
                "code": serde_json::Value::Null,
            }
        });

        (self.status, Json(body)).into_response()
    }
}
