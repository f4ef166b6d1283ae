use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use minivault_service::ServiceError;
use minivault_upstream::UpstreamError;
use serde_json::json;
use tracing::{error, warn};

/// Error body is always `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Configuration(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ServiceError::MissingField(_) | ServiceError::InvalidField { .. } => Self::bad_request(err.to_string()),
            ServiceError::Unauthorized(message) => Self::new(StatusCode::UNAUTHORIZED, message),
            ServiceError::Upstream(upstream) => upstream.into(),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match &err {
            UpstreamError::Status { status, message, .. } => {
                let status = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                Self::new(status, message.clone())
            }
            UpstreamError::InvalidId { .. } => Self::bad_request(err.to_string()),
            _ => {
                // details stay in the log
                error!(error = %err, service = %err.service(), "upstream request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Upstream request failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), error = %self.message, "request failed");
        } else {
            warn!(status = self.status.as_u16(), error = %self.message, "request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minivault_upstream::Service;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Configuration("NOTION_TOKEN".into()), 500, "Missing configuration: NOTION_TOKEN"),
            (ServiceError::MissingField("title".into()), 400, "Missing required field: title"),
            (ServiceError::Unauthorized("GitHub credential required"), 401, "GitHub credential required"),
        ];
        for (err, status, message) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status().as_u16(), status);
            assert_eq!(api.message(), message);
        }
    }

    #[test]
    fn upstream_status_passes_through() {
        let api = ApiError::from(ServiceError::Upstream(UpstreamError::Status {
            service: Service::Notion,
            status: 404,
            message: "Could not find database".into(),
        }));
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
        assert_eq!(api.message(), "Could not find database");

        let odd = ApiError::from(UpstreamError::Status {
            service: Service::GitHub,
            status: 302,
            message: "moved".into(),
        });
        assert_eq!(odd.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn rejected_ids_are_client_errors() {
        let api = ApiError::from(UpstreamError::InvalidId {
            service: Service::Notion,
            id: "../blocks".into(),
        });
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.message(), "`../blocks` is not a valid Notion id");
    }

    #[test]
    fn decode_failures_hide_details() {
        let api = ApiError::from(UpstreamError::Decode {
            service: Service::Notion,
            detail: "expected value at line 1".into(),
        });
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message(), "Upstream request failed");
    }
}
