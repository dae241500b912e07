//! 管理后台错误类型定义
//!
//! 业务错误来自 `sponsorship_core`，这里负责附加操作上下文并映射为 HTTP 响应

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sponsorship_core::SponsorshipError;

/// 管理后台错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // 认证错误
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // 请求体校验错误
    #[error("{0}")]
    Validation(String),

    /// 带操作上下文的业务失败，`message` 为面向用户的完整提示
    #[error("{message}")]
    Rejected {
        message: String,
        #[source]
        source: SponsorshipError,
    },

    #[error(transparent)]
    Sponsorship(#[from] SponsorshipError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    /// 给业务错误附加提示语
    ///
    /// 仅对校验类错误生效，其余错误保持原样
    pub fn rejected(err: SponsorshipError, message: impl FnOnce(&str) -> String) -> Self {
        match err.validation_messages() {
            Some(messages) => Self::Rejected {
                message: message(&messages),
                source: err,
            },
            None => Self::Sponsorship(err),
        }
    }

    fn business(&self) -> Option<&SponsorshipError> {
        match self {
            Self::Rejected { source, .. } => Some(source),
            Self::Sponsorship(err) => Some(err),
            _ => None,
        }
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected { source, .. } | Self::Sponsorship(source) => match source {
                SponsorshipError::ConferenceNotFound(_)
                | SponsorshipError::SponsorshipNotFound(_)
                | SponsorshipError::ShipmentNotFound(_)
                | SponsorshipError::SwagNotFound(_) => StatusCode::NOT_FOUND,
                SponsorshipError::Forbidden(_) => StatusCode::FORBIDDEN,
                SponsorshipError::Invalid(_) | SponsorshipError::TrackingNumberTaken(_) => {
                    StatusCode::BAD_REQUEST
                }
                SponsorshipError::SponsorshipLevelRequired
                | SponsorshipError::ShipmentsInTransit { .. } => StatusCode::CONFLICT,
                SponsorshipError::EmailFailed(_) => StatusCode::BAD_GATEWAY,
                SponsorshipError::Storage(_)
                | SponsorshipError::Database(_)
                | SponsorshipError::Serialization(_)
                | SponsorshipError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Rejected { source, .. } | Self::Sponsorship(source) => source.error_code(),
        }
    }

    fn is_system_error(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            _ => self.business().is_some_and(|err| !err.is_business_error()),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if self.is_system_error() {
            tracing::error!(error = %self, code = self.error_code(), "Request failed");
            "Internal server error, please try again later".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 处理器 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;
