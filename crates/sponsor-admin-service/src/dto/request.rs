//! 请求 DTO 定义
//!
//! 请求体只接受白名单字段，`conference_id` 只从 URL 取得。
//! 可清空字段使用 `Option<Option<T>>`：缺省表示不修改，`null` 表示清空。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use sponsorship_core::SponsorshipState;
use sponsorship_core::dto::{
    EmailMessage, ShipmentArrival, ShipmentAttributes, SponsorshipAttributes, SwagAttributes,
};
use validator::{Validate, ValidateEmail, ValidationError};

/// 区分字段缺省与显式 `null`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 创建 / 更新赞助请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SponsorshipRequest {
    #[validate(length(max = 255, message = "Name is too long (maximum is 255 characters)"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 2048, message = "Website url is too long"))]
    pub website_url: Option<Option<String>>,
    pub picture_cache: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub sponsorship_level_id: Option<Option<i64>>,
    pub has_swag: Option<bool>,
    pub has_banner: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 255, message = "Email is too long"))]
    pub email: Option<Option<String>>,
    pub state: Option<SponsorshipState>,
    pub paid: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub amount: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 255, message = "Invoice name is too long"))]
    pub invoice_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 1024, message = "Invoice address is too long"))]
    pub invoice_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 64, message = "Invoice vat is too long"))]
    pub invoice_vat: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub invoice_sent_at: Option<Option<NaiveDate>>,
    #[serde(default)]
    #[validate(nested)]
    pub swags: Vec<SwagRequest>,
    #[serde(default)]
    #[validate(nested)]
    pub shipments: Vec<ShipmentRequest>,
}

/// 嵌套物料
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SwagRequest {
    pub id: Option<i64>,
    #[validate(length(max = 255, message = "Swag name is too long"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub quantity: Option<Option<i32>>,
    #[serde(rename = "_destroy", default)]
    pub destroy: bool,
}

/// 嵌套发货记录
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShipmentRequest {
    pub id: Option<i64>,
    #[validate(length(max = 100, message = "Carrier is too long"))]
    pub carrier: Option<String>,
    #[validate(length(max = 100, message = "Tracking number is too long"))]
    pub track_no: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub boxes: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub dispatched_at: Option<Option<DateTime<Utc>>>,
    pub swag_ids: Option<Vec<i64>>,
    #[serde(rename = "_destroy", default)]
    pub destroy: bool,
}

impl From<SwagRequest> for SwagAttributes {
    fn from(req: SwagRequest) -> Self {
        Self {
            id: req.id,
            name: req.name,
            quantity: req.quantity,
            destroy: req.destroy,
        }
    }
}

impl From<ShipmentRequest> for ShipmentAttributes {
    fn from(req: ShipmentRequest) -> Self {
        Self {
            id: req.id,
            carrier: req.carrier,
            track_no: req.track_no,
            boxes: req.boxes,
            dispatched_at: req.dispatched_at,
            swag_ids: req.swag_ids,
            destroy: req.destroy,
        }
    }
}

impl From<SponsorshipRequest> for SponsorshipAttributes {
    fn from(req: SponsorshipRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            website_url: req.website_url,
            picture_cache: req.picture_cache,
            sponsorship_level_id: req.sponsorship_level_id,
            has_swag: req.has_swag,
            has_banner: req.has_banner,
            email: req.email,
            state: req.state,
            paid: req.paid,
            amount: req.amount,
            invoice_name: req.invoice_name,
            invoice_address: req.invoice_address,
            invoice_vat: req.invoice_vat,
            invoice_sent_at: req.invoice_sent_at,
            swags: req.swags.into_iter().map(Into::into).collect(),
            shipments: req.shipments.into_iter().map(Into::into).collect(),
        }
    }
}

/// 发送邮件请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmailRequest {
    #[validate(custom(function = "validate_sender"))]
    pub from: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Subject can't be blank"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Body can't be blank"))]
    pub body: String,
}

/// 空白发件人表示使用默认发件人
fn validate_sender(from: &str) -> Result<(), ValidationError> {
    let from = from.trim();
    if from.is_empty() || from.validate_email() {
        return Ok(());
    }
    Err(ValidationError::new("email").with_message("From is not a valid email address".into()))
}

impl From<EmailRequest> for EmailMessage {
    fn from(req: EmailRequest) -> Self {
        Self {
            from: req.from,
            subject: req.subject,
            body: req.body,
        }
    }
}

/// 到货跟踪请求
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArrivalRequest {
    pub delivered: Option<bool>,
    pub available: Option<bool>,
}

impl From<ArrivalRequest> for ShipmentArrival {
    fn from(req: ArrivalRequest) -> Self {
        Self {
            delivered: req.delivered,
            available: req.available,
        }
    }
}
