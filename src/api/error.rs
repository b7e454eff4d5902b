//! HTTP mapping for [`OnTymError`]

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

use crate::OnTymError;

/// Error body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

impl OnTymError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            OnTymError::Validation { .. } => StatusCode::BAD_REQUEST,
            OnTymError::Unauthorized => StatusCode::UNAUTHORIZED,
            OnTymError::Forbidden { .. } => StatusCode::FORBIDDEN,
            OnTymError::NotFound { .. } => StatusCode::NOT_FOUND,
            OnTymError::Conflict { .. } => StatusCode::CONFLICT,
            OnTymError::TimedOut => StatusCode::REQUEST_TIMEOUT,
            OnTymError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            OnTymError::Upstream { .. } | OnTymError::ResponseFormat { .. } => {
                StatusCode::BAD_GATEWAY
            }
            OnTymError::Config { .. } => StatusCode::SERVICE_UNAVAILABLE,
            OnTymError::Store { .. } | OnTymError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn summary(&self) -> String {
        match self {
            OnTymError::Validation { message }
            | OnTymError::Conflict { message }
            | OnTymError::Forbidden { message } => message.clone(),
            OnTymError::NotFound { entity } => format!("{entity} not found"),
            OnTymError::Unauthorized => "Invalid email or password".to_string(),
            OnTymError::Upstream { .. } => "External service request failed".to_string(),
            OnTymError::ResponseFormat { .. } => {
                "External service returned an unexpected response".to_string()
            }
            OnTymError::Config { .. } => "Service not configured".to_string(),
            OnTymError::TimedOut => "Request timed out".to_string(),
            OnTymError::PayloadTooLarge => "Request body too large".to_string(),
            OnTymError::Store { .. } | OnTymError::Io { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for OnTymError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.summary(),
            details: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for OnTymError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return OnTymError::PayloadTooLarge;
        }
        OnTymError::validation(rejection.body_text())
    }
}

/// Re-render the bare 408/413 answers of the timeout and body-limit layers
/// with the shared error body
pub async fn render_layer_rejection(response: Response) -> Response {
    match response.status() {
        StatusCode::REQUEST_TIMEOUT => OnTymError::TimedOut.into_response(),
        StatusCode::PAYLOAD_TOO_LARGE => OnTymError::PayloadTooLarge.into_response(),
        _ => response,
    }
}

impl From<QueryRejection> for OnTymError {
    fn from(rejection: QueryRejection) -> Self {
        OnTymError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OnTymError::validation("Message is required"), StatusCode::BAD_REQUEST)]
    #[case(OnTymError::Unauthorized, StatusCode::UNAUTHORIZED)]
    #[case(OnTymError::forbidden("Only suppliers can list products"), StatusCode::FORBIDDEN)]
    #[case(OnTymError::not_found("Post"), StatusCode::NOT_FOUND)]
    #[case(OnTymError::conflict("User already exists"), StatusCode::CONFLICT)]
    #[case(OnTymError::upstream("reset"), StatusCode::BAD_GATEWAY)]
    #[case(OnTymError::response_format("prose", "raw"), StatusCode::BAD_GATEWAY)]
    #[case(OnTymError::config("missing key"), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(OnTymError::store("disk full"), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(OnTymError::TimedOut, StatusCode::REQUEST_TIMEOUT)]
    #[case(OnTymError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE)]
    fn test_status_mapping(#[case] err: OnTymError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
        assert_eq!(err.into_response().status(), expected);
    }

    #[tokio::test]
    async fn test_layer_rejections_get_json_body() {
        let bare = (StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded").into_response();
        let rendered = render_layer_rejection(bare).await;
        assert_eq!(rendered.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let bytes = axum::body::to_bytes(rendered.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Request body too large");
        assert!(body["details"].is_string());

        let ok = render_layer_rejection(StatusCode::NO_CONTENT.into_response()).await;
        assert_eq!(ok.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_validation_summary_is_the_message() {
        let err = OnTymError::validation("Message is required");
        assert_eq!(err.summary(), "Message is required");
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = OnTymError::store("keyspace users is corrupt");
        assert!(!err.summary().contains("corrupt"));
        assert!(!err.user_message().contains("corrupt"));

        let err = OnTymError::response_format("not JSON", "model said hello");
        assert!(!err.summary().contains("hello"));
        assert!(!err.user_message().contains("hello"));
    }
}
