use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] JsonRejection),

    #[error("Invalid activity record: {0}")]
    InvalidRecord(String),

    #[error("Batch of {len} records exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidJson(_) => "INVALID_JSON",
            AppError::InvalidRecord(_) => "INVALID_RECORD",
            AppError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidJson(rejection) => rejection.status(),
            AppError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
            AppError::BatchTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": {
                "message": self.to_string(),
                "code": self.code(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::InvalidRecord("negative timestamp".to_string());
        assert_eq!(err.code(), "INVALID_RECORD");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = AppError::BatchTooLarge { len: 3, max: 2 };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "Batch of 3 records exceeds the limit of 2");
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::InvalidRecord("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
