use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mastery_algo::{CatalogError, PathError};
use serde::Serialize;

use crate::services::ServiceError;

/// `{ success: true, data }` envelope
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
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
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
            "Internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Validation(_) => Self::validation(message),
            ServiceError::NotFound(_) => Self::not_found(message),
            ServiceError::OutOfOrder { .. } => {
                json_error(StatusCode::CONFLICT, "OUT_OF_ORDER", message)
            }
            ServiceError::Path(PathError::Archived(_)) => {
                json_error(StatusCode::CONFLICT, "PATH_ARCHIVED", message)
            }
            ServiceError::Catalog(CatalogError::DuplicateCurriculumCode { .. }) => {
                Self::conflict(message)
            }
            ServiceError::Catalog(CatalogError::EmptyId) => Self::validation(message),
            ServiceError::Trace(_) => Self::internal(message),
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
        is_operational: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = vec![
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                ServiceError::OutOfOrder {
                    student_id: "s".into(),
                    kc_id: "k".into(),
                    last: 2,
                    timestamp: 1,
                },
                StatusCode::CONFLICT,
                "OUT_OF_ORDER",
            ),
            (
                ServiceError::Path(PathError::Archived("s".into())),
                StatusCode::CONFLICT,
                "PATH_ARCHIVED",
            ),
            (ServiceError::Catalog(CatalogError::EmptyId), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ];

        for (err, status, code) in cases {
            let app_error = AppError::from(err);
            assert_eq!(app_error.status(), status);
            assert_eq!(app_error.code(), code);
        }
    }
}
