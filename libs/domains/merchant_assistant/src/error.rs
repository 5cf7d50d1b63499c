use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use strum::Display;
use thiserror::Error;
use uuid::Uuid;

/// Result type for merchant assistant operations
pub type AssistantResult<T> = Result<T, AssistantError>;

/// External provider a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UpstreamService {
    Embedding,
    Completion,
    VectorIndex,
}

/// Errors that can occur in the merchant assistant domain
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Caller-supplied data violates a precondition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An external provider failed, timed out, or returned a malformed response
    #[error("{service} upstream error ({status}): {message}")]
    Upstream {
        service: UpstreamService,
        status: StatusCode,
        message: String,
    },

    /// The conversation store could not read or write durably
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Interaction not found
    #[error("Interaction not found: {0}")]
    NotFound(Uuid),

    /// Startup misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    pub fn upstream(
        service: UpstreamService,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        AssistantError::Upstream {
            service,
            status,
            message: message.into(),
        }
    }

    /// The provider never answered within its deadline
    pub fn timeout(service: UpstreamService) -> Self {
        Self::upstream(service, StatusCode::GATEWAY_TIMEOUT, "request timed out")
    }

    /// True when the provider could not be reached at all, as opposed to
    /// answering with a rejection.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            AssistantError::Upstream { status, .. }
                if *status == StatusCode::GATEWAY_TIMEOUT || *status == StatusCode::BAD_GATEWAY
        )
    }

    /// HTTP status this error is surfaced with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AssistantError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AssistantError::NotFound(_) => StatusCode::NOT_FOUND,
            AssistantError::Upstream { status, .. } if *status == StatusCode::GATEWAY_TIMEOUT => {
                StatusCode::GATEWAY_TIMEOUT
            }
            AssistantError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AssistantError::Persistence(_) | AssistantError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<core_config::ConfigError> for AssistantError {
    fn from(err: core_config::ConfigError) -> Self {
        AssistantError::Config(err.to_string())
    }
}

impl From<sea_orm::DbErr> for AssistantError {
    fn from(err: sea_orm::DbErr) -> Self {
        AssistantError::Persistence(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for AssistantError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        AssistantError::upstream(
            UpstreamService::VectorIndex,
            StatusCode::BAD_GATEWAY,
            err.to_string(),
        )
    }
}

impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AssistantError::Persistence(detail) => {
                tracing::error!(error = %detail, "Conversation store failure");
                "Persistence error".to_string()
            }
            AssistantError::Config(detail) => {
                tracing::error!(error = %detail, "Assistant misconfigured");
                "Internal error".to_string()
            }
            AssistantError::Upstream { .. } => {
                tracing::error!(error = %self, "Upstream provider failure");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
