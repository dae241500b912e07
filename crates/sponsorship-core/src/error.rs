//! 赞助服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

use crate::validation::ValidationFailure;

/// 赞助服务错误类型
#[derive(Debug, Error)]
pub enum SponsorshipError {
    // === 资源不存在 ===
    #[error("会议不存在: {0}")]
    ConferenceNotFound(String),

    #[error("赞助记录不存在: {0}")]
    SponsorshipNotFound(i64),

    #[error("发货记录不存在: {0}")]
    ShipmentNotFound(i64),

    #[error("物料记录不存在: {0}")]
    SwagNotFound(i64),

    // === 权限 ===
    #[error("无权访问: {0}")]
    Forbidden(String),

    // === 业务规则 ===
    #[error("You need to create at least one sponsorship level to add a sponsor")]
    SponsorshipLevelRequired,

    #[error("{0}")]
    Invalid(ValidationFailure),

    #[error("Tracking number {0} has already been taken")]
    TrackingNumberTaken(String),

    #[error("{count} shipment(s) are still in transit")]
    ShipmentsInTransit { sponsorship_id: i64, count: usize },

    #[error("Email failed: {0}")]
    EmailFailed(String),

    // === 系统错误 ===
    #[error("图片存储错误: {0}")]
    Storage(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 赞助服务 Result 类型别名
pub type Result<T> = std::result::Result<T, SponsorshipError>;

impl SponsorshipError {
    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Storage(_) | Self::Internal(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConferenceNotFound(_) => "CONFERENCE_NOT_FOUND",
            Self::SponsorshipNotFound(_) => "SPONSORSHIP_NOT_FOUND",
            Self::ShipmentNotFound(_) => "SHIPMENT_NOT_FOUND",
            Self::SwagNotFound(_) => "SWAG_NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::SponsorshipLevelRequired => "SPONSORSHIP_LEVEL_REQUIRED",
            Self::Invalid(_) | Self::TrackingNumberTaken(_) => "VALIDATION_ERROR",
            Self::ShipmentsInTransit { .. } => "SHIPMENTS_IN_TRANSIT",
            Self::EmailFailed(_) => "EMAIL_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 面向用户的校验消息（以 ". " 连接），非校验类错误返回 None
    pub fn validation_messages(&self) -> Option<String> {
        match self {
            Self::Invalid(failure) => Some(failure.full_messages()),
            Self::TrackingNumberTaken(_) => Some(self.to_string()),
            Self::ShipmentsInTransit { .. } => Some(self.to_string()),
            _ => None,
        }
    }
}

impl From<ValidationFailure> for SponsorshipError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Invalid(failure)
    }
}
