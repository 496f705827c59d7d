use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("error decoding json")]
    DecodeJson,

    #[error("invalid todo id")]
    InvalidId,

    #[error("todo id is required")]
    MissingId,

    #[error(transparent)]
    Validation(#[from] DomainError),

    /// PUT で対象が見つからない（400）
    #[error("todo id not found")]
    IdNotFound,

    /// GET / DELETE で対象が見つからない（404）
    #[error("todo id not found")]
    NotFound,

    #[error("could not insert data: {0}")]
    InsertFailed(String),

    #[error("could not update data: {0}")]
    UpdateFailed(String),

    #[error("could not delete data: {0}")]
    DeleteFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("Method not supported")]
    MethodNotSupported,
}

/// エラーレスポンスのボディ `{"error": code, "message": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: i32,
    pub message: String,
}

impl ApiError {
    /// HTTP ステータス、ボディの error コード、メッセージ
    fn parts(&self) -> (StatusCode, i32, &'static str) {
        match self {
            ApiError::DecodeJson => (StatusCode::BAD_REQUEST, -1, "error decoding json"),
            ApiError::InvalidId => (StatusCode::BAD_REQUEST, -1, "invalid todo id"),
            ApiError::MissingId => (StatusCode::BAD_REQUEST, 400, "todo id is required"),
            ApiError::Validation(DomainError::EmptyTitle) => {
                (StatusCode::BAD_REQUEST, 400, "title should not be null")
            }
            ApiError::Validation(DomainError::TitleTooLong(_)) => {
                (StatusCode::BAD_REQUEST, 400, "title is too long")
            }
            ApiError::IdNotFound => (StatusCode::BAD_REQUEST, 400, "todo id not found"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, 404, "todo id not found"),
            ApiError::InsertFailed(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, 500, "could not insert data")
            }
            ApiError::UpdateFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, 500, "could not update data")
            }
            ApiError::DeleteFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, 500, "could not delete data")
            }
            ApiError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, 500, "internal server error")
            }
            ApiError::MethodNotSupported => {
                (StatusCode::METHOD_NOT_ALLOWED, -1, "Method not supported")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: code,
            message: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
