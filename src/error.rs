use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::auth::AuthError;
use crate::llm::LlmError;
use crate::pdf::RenderError;
use crate::plan::PlanError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    Unprocessable(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

impl From<PlanError> for ApiError {
    fn from(value: PlanError) -> Self {
        match value {
            PlanError::EmptyPlan => ApiError::Unprocessable(value.to_string()),
            PlanError::InvalidDayNumber(_) => ApiError::BadRequest(value.to_string()),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(value: LlmError) -> Self {
        error!("LLM error: {value}");
        ApiError::BadGateway("Failed to generate plan".into())
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::AudienceMismatch => {
                ApiError::Unauthorized(value.to_string())
            }
            AuthError::ProviderUnavailable(status) => {
                error!("Identity provider returned {status}");
                ApiError::BadGateway("Failed to verify identity".into())
            }
            AuthError::Http(err) => {
                error!("Identity provider error: {err}");
                ApiError::BadGateway("Failed to verify identity".into())
            }
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(value: RenderError) -> Self {
        error!("PDF render error: {value}");
        ApiError::Internal("Failed to render plan document".into())
    }
}
