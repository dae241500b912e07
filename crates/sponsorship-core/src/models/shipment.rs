//! 物料发货记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 发货记录
///
/// 由组织者登记，到货后由到货跟踪标记 available / delivered，不会自动删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SponsorShipment {
    pub id: i64,
    pub sponsorship_id: i64,
    /// 承运商
    pub carrier: String,
    /// 运单号，全局唯一
    pub track_no: String,
    /// 箱数，必填
    #[sqlx(default)]
    pub boxes: Option<i32>,
    #[sqlx(default)]
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered: bool,
    /// 是否已到达会场可取用
    pub available: bool,
    /// 本次发货包含的物料 ID
    #[sqlx(default)]
    pub swag_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SponsorShipment {
    pub fn new(
        sponsorship_id: i64,
        carrier: impl Into<String>,
        track_no: impl Into<String>,
        boxes: Option<i32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            sponsorship_id,
            carrier: carrier.into(),
            track_no: track_no.into(),
            boxes,
            dispatched_at: None,
            delivered: false,
            available: false,
            swag_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 已发出且尚未送达
    pub fn is_in_transit(&self) -> bool {
        self.dispatched_at.is_some() && !self.delivered
    }
}
