//! HTTP 边界上的错误类型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::routeros::RouterOsError;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::api::handlers::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    /// 缺少字段、格式错误、唯一性冲突
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("router error: {0}")]
    Router(#[from] RouterOsError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, AppError>;

/// 5xx 响应的内部细节，由 `attach_error_detail` 中间件决定是否展示
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: &'static str,
    pub detail: String,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Router(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// 是否为唯一约束冲突
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let generic = match &self {
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg) => {
                return (status, ApiResponse::<()>::error(msg.clone())).into_response();
            }
            AppError::Router(_) => "Router communication failed",
            AppError::Database(_) | AppError::Internal(_) => "Internal server error",
        };

        tracing::error!("❌ {}", self);
        let mut response = (status, ApiResponse::<()>::error(generic.to_string())).into_response();
        response.extensions_mut().insert(ErrorDetail {
            message: generic,
            detail: self.to_string(),
        });
        response
    }
}
