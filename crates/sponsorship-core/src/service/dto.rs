//! 服务层数据传输对象
//!
//! 可清空字段使用 `Option<Option<T>>`：外层 None 表示未提交（保留原值），
//! `Some(None)` 表示清空。

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::lifecycle::StateCounts;
use crate::models::{Sponsorship, SponsorshipAggregate, SponsorshipLevel, SponsorshipState};

/// 赞助记录可写字段
#[derive(Debug, Clone, Default)]
pub struct SponsorshipAttributes {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub website_url: Option<Option<String>>,
    /// 图片上传令牌
    pub picture_cache: Option<String>,
    pub sponsorship_level_id: Option<Option<i64>>,
    pub has_swag: Option<bool>,
    pub has_banner: Option<bool>,
    pub email: Option<Option<String>>,
    pub state: Option<SponsorshipState>,
    pub paid: Option<bool>,
    pub amount: Option<Option<f64>>,
    pub invoice_name: Option<Option<String>>,
    pub invoice_address: Option<Option<String>>,
    pub invoice_vat: Option<Option<String>>,
    pub invoice_sent_at: Option<Option<NaiveDate>>,
    pub swags: Vec<SwagAttributes>,
    pub shipments: Vec<ShipmentAttributes>,
}

/// 嵌套物料属性
///
/// 无 id 新建，有 id 更新，`destroy` 为 true 时删除
#[derive(Debug, Clone, Default)]
pub struct SwagAttributes {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub quantity: Option<Option<i32>>,
    pub destroy: bool,
}

/// 嵌套发货属性
#[derive(Debug, Clone, Default)]
pub struct ShipmentAttributes {
    pub id: Option<i64>,
    pub carrier: Option<String>,
    pub track_no: Option<String>,
    pub boxes: Option<Option<i32>>,
    pub dispatched_at: Option<Option<DateTime<Utc>>>,
    pub swag_ids: Option<Vec<i64>>,
    pub destroy: bool,
}

/// 到货跟踪输入
#[derive(Debug, Clone, Copy, Default)]
pub struct ShipmentArrival {
    pub delivered: Option<bool>,
    pub available: Option<bool>,
}

/// 邮件内容
#[derive(Debug, Clone, Default)]
pub struct EmailMessage {
    /// 为空时使用默认发件人
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
}

/// 赞助列表及看板计数
#[derive(Debug, Clone, Serialize)]
pub struct SponsorshipIndex {
    pub sponsorships: Vec<SponsorshipAggregate>,
    pub counts: StateCounts,
}

/// 新建表单：默认值与可选赞助等级
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSponsorshipForm {
    pub sponsorship: Sponsorship,
    pub levels: Vec<SponsorshipLevel>,
}

/// 预填的邮件表单
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraft {
    pub from: String,
    pub to: Option<String>,
    pub recipient_name: String,
}

/// 增删改操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Destroy,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }

    /// 成功提示，`noun` 为 "Sponsor" 或 "Sponsorship"
    pub fn success_message(&self, noun: &str) -> String {
        match self {
            Self::Create => format!("{noun} successfully created."),
            Self::Update => format!("{noun} successfully updated."),
            Self::Destroy => format!("{noun} successfully deleted."),
        }
    }

    /// 失败提示，`noun` 为小写名词，`messages` 为连接后的校验消息
    pub fn failure_message(&self, noun: &str, messages: &str) -> String {
        match self {
            Self::Create => format!("Creating {noun} failed: {messages}."),
            Self::Update => format!("Update {noun} failed: {messages}."),
            Self::Destroy => format!("Deleting {noun} failed! {messages}."),
        }
    }
}

/// 去掉首尾空白，空串视为未填写
pub(crate) fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_messages() {
        assert_eq!(
            Mutation::Create.success_message("Sponsor"),
            "Sponsor successfully created."
        );
        assert_eq!(
            Mutation::Create.failure_message("sponsor", "Name can't be blank"),
            "Creating sponsor failed: Name can't be blank."
        );
        assert_eq!(
            Mutation::Update.failure_message("sponsorship", "Amount must be greater than or equal to 0"),
            "Update sponsorship failed: Amount must be greater than or equal to 0."
        );
        assert_eq!(
            Mutation::Destroy.failure_message("sponsor", "1 shipment(s) are still in transit"),
            "Deleting sponsor failed! 1 shipment(s) are still in transit."
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Some("  acme  ".to_string())), Some("acme".to_string()));
        assert_eq!(normalize(Some("   ".to_string())), None);
        assert_eq!(normalize(None), None);
    }
}
