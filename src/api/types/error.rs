//! JSON error envelope: `{"error": {"message", "type", "param", "code"}}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    NotFoundError,
    /// The question was read but could not be turned into a search
    UnprocessableQueryError,
    ServerError,
    ServiceUnavailableError,
}

impl ApiErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequestError => "invalid_request_error",
            Self::NotFoundError => "not_found_error",
            Self::UnprocessableQueryError => "unprocessable_query_error",
            Self::ServerError => "server_error",
            Self::ServiceUnavailableError => "service_unavailable_error",
        }
    }

    fn default_status(self) -> StatusCode {
        match self {
            Self::InvalidRequestError => StatusCode::BAD_REQUEST,
            Self::NotFoundError => StatusCode::NOT_FOUND,
            Self::UnprocessableQueryError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailableError => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ApiErrorType,
    pub message: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status: kind.default_status(),
            kind,
            message: message.into(),
            param: None,
            code: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::InvalidRequestError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::NotFoundError, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::UnprocessableQueryError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::ServerError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorType::ServiceUnavailableError, message)
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: Body<'a>,
}

#[derive(Serialize)]
struct Body<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    kind: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    param: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            error: Body {
                message: &self.message,
                kind: self.kind,
                param: self.param.as_deref(),
                code: self.code.as_deref(),
            },
        };
        (self.status, axum::Json(envelope)).into_response()
    }
}

/// Clients see the friendly Spanish message; the detailed error is only logged
impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        tracing::warn!(code = err.code(), error = %err, "Request failed");

        let api_error = match &err {
            DomainError::Validation { message } => Self::bad_request(message),
            DomainError::Normalization { .. } | DomainError::Analysis { .. } => {
                Self::unprocessable(err.user_message())
            }
            DomainError::Generation { .. } | DomainError::Parse { .. } | DomainError::Store { .. } => {
                Self::unavailable(err.user_message())
            }
            DomainError::QueryExecution { .. }
            | DomainError::Configuration { .. }
            | DomainError::Internal { .. } => Self::internal(err.user_message()),
        };
        api_error.with_code(err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn rendered(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let (status, body) = rendered(
            ApiError::bad_request("Invalid value")
                .with_param("query")
                .with_code("validation_error"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["param"], "query");
        assert_eq!(body["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_unset_fields_are_omitted() {
        let (status, body) = rendered(ApiError::not_found("Unknown session")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Unknown session");
        assert!(body["error"].get("param").is_none());
    }

    #[test]
    fn test_domain_error_mapping() {
        let err: ApiError = DomainError::analysis("unparsable").into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code.as_deref(), Some("analysis_error"));
        assert!(err.message.contains("reformularla"));

        let err: ApiError = DomainError::generation("gemini-2.0-flash", "timeout").into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.message.contains("timeout"));

        let err: ApiError = DomainError::store("disk I/O error").into();
        assert_eq!(err.kind, ApiErrorType::ServiceUnavailableError);

        let err: ApiError = DomainError::validation("Query must not be empty").into();
        assert_eq!(err.message, "Query must not be empty");
        assert_eq!(err.to_string(), "invalid_request_error: Query must not be empty");
    }
}
