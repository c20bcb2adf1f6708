use crate::config::SetupError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bitrix::BitrixError;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    BitrixApi(String),
    ConfigError(String),
    NotConfigured(String),
    HttpError(reqwest::Error),
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BitrixApi(msg) => write!(f, "Bitrix24 API error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NotConfigured(msg) => write!(f, "Connection not configured: {}", msg),
            AppError::HttpError(err) => write!(f, "HTTP error: {}", err),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // A URL do Bitrix24 carrega o token
        AppError::HttpError(err.without_url())
    }
}

impl From<BitrixError> for AppError {
    fn from(err: BitrixError) -> Self {
        match err {
            BitrixError::HttpError(e) => AppError::from(e),
            BitrixError::ConfigError(msg) => AppError::ConfigError(msg),
            other => AppError::BitrixApi(bitrix::redact_url(&other.to_string())),
        }
    }
}

impl From<SetupError> for AppError {
    fn from(err: SetupError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BitrixApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotConfigured(msg) => (StatusCode::CONFLICT, msg),
            AppError::HttpError(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = json!({
            "error": error_message,
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_is_bad_request() {
        let response = AppError::from(SetupError::MissingFields).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bitrix_error_is_redacted() {
        let err = AppError::from(BitrixError::ApiError {
            status: 401,
            message: "falhou em /pbi.php?token=s3cr3t&table=crm_deal".to_string(),
        });
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(!text.contains("s3cr3t"));
    }

    #[test]
    fn test_not_configured_is_conflict() {
        let response = AppError::NotConfigured("x".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
