use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::ServiceError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    pub fields: Vec<String>,
}

#[derive(Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(SuccessResponse { success: true, data })).into_response()
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    details: Option<ErrorDetails>,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        let mut err = Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message);
        if !fields.is_empty() {
            err.details = Some(ErrorDetails { fields });
        }
        err
    }

    pub fn unavailable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::operational(StatusCode::SERVICE_UNAVAILABLE, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "Internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { message, fields } => AppError::validation(message, fields),
            ServiceError::NotFound(message) => AppError::not_found(message),
            ServiceError::Persistence(source) => {
                tracing::error!(error = %source, "store operation failed");
                AppError::internal(source.to_string())
            }
            ServiceError::RecommendationUnavailable(source) => {
                tracing::warn!(error = %source, "recommendation dependencies unavailable");
                AppError::unavailable(
                    "RECOMMENDATION_UNAVAILABLE",
                    "Recommendations are temporarily unavailable",
                )
            }
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        details: None,
        is_operational: true,
    }
}
