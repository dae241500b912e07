//! 赞助实体定义
//!
//! 会议（只读）-> 赞助等级 -> 赞助记录，赞助记录拥有物料和发货两个子集合

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::SponsorshipState;
use super::shipment::SponsorShipment;
use super::swag::{SponsorSwag, SwagStatus};

/// 会议
///
/// 由主站维护，本服务通过 short_title 定位
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub id: i64,
    /// URL 中使用的短标识，全局唯一
    pub short_title: String,
    pub title: String,
}

/// 赞助等级（如 Gold / Silver）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipLevel {
    pub id: i64,
    pub conference_id: i64,
    pub title: String,
    /// 排序位置，越小越靠前
    pub position: i32,
}

/// 赞助记录
///
/// 同时承载赞助商资料与赞助协议信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sponsorship {
    pub id: i64,
    pub conference_id: i64,
    #[sqlx(default)]
    pub sponsorship_level_id: Option<i64>,
    /// 通过提交者入口创建时记录的用户 ID
    #[sqlx(default)]
    pub submitter_id: Option<i64>,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    #[sqlx(default)]
    pub website_url: Option<String>,
    #[sqlx(default)]
    pub email: Option<String>,
    /// 已持久化的 Logo 引用
    #[sqlx(default)]
    pub picture: Option<String>,
    pub has_swag: bool,
    pub has_banner: bool,
    pub paid: bool,
    #[sqlx(default)]
    pub amount: Option<f64>,
    #[sqlx(default)]
    pub invoice_name: Option<String>,
    #[sqlx(default)]
    pub invoice_address: Option<String>,
    #[sqlx(default)]
    pub invoice_vat: Option<String>,
    #[sqlx(default)]
    pub invoice_sent_at: Option<NaiveDate>,
    pub state: SponsorshipState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sponsorship {
    /// 新建记录的默认值，id 为 0 表示尚未持久化
    pub fn draft(conference_id: i64, submitter_id: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            conference_id,
            sponsorship_level_id: None,
            submitter_id,
            name: String::new(),
            description: None,
            website_url: None,
            email: None,
            picture: None,
            has_swag: false,
            has_banner: false,
            paid: false,
            amount: None,
            invoice_name: None,
            invoice_address: None,
            invoice_vat: None,
            invoice_sent_at: None,
            state: SponsorshipState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }
}

/// 赞助聚合：赞助记录及其物料、发货子集合
///
/// 增删改都以聚合为单位校验和落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipAggregate {
    pub sponsorship: Sponsorship,
    pub swags: Vec<SponsorSwag>,
    pub shipments: Vec<SponsorShipment>,
}

impl SponsorshipAggregate {
    pub fn new(sponsorship: Sponsorship) -> Self {
        Self {
            sponsorship,
            swags: Vec::new(),
            shipments: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.sponsorship.id
    }

    /// 已发出但尚未送达的发货记录
    pub fn shipments_in_transit(&self) -> Vec<&SponsorShipment> {
        self.shipments.iter().filter(|s| s.is_in_transit()).collect()
    }

    /// 每个物料的送达 / 到场状态
    pub fn swag_statuses(&self) -> Vec<SwagStatus> {
        self.swags
            .iter()
            .map(|swag| SwagStatus {
                delivered: swag.delivered(&self.shipments),
                at_venue: swag.at_venue(&self.shipments),
                swag: swag.clone(),
            })
            .collect()
    }
}
