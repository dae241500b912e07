//! 赞助物料
//!
//! 赞助商承诺提供的物料（T 恤、贴纸等），通过发货记录送达会场

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shipment::SponsorShipment;

/// 赞助物料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SponsorSwag {
    pub id: i64,
    pub sponsorship_id: i64,
    pub name: String,
    /// 数量可留空
    #[sqlx(default)]
    pub quantity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SponsorSwag {
    pub fn new(sponsorship_id: i64, name: impl Into<String>, quantity: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            sponsorship_id,
            name: name.into(),
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    fn linked<'a>(
        &'a self,
        shipments: &'a [SponsorShipment],
    ) -> impl Iterator<Item = &'a SponsorShipment> + 'a {
        shipments
            .iter()
            .filter(move |shipment| shipment.swag_ids.contains(&self.id))
    }

    /// 所有关联的发货记录都已送达；没有关联发货时为 true
    pub fn delivered(&self, shipments: &[SponsorShipment]) -> bool {
        self.linked(shipments).all(|shipment| shipment.delivered)
    }

    /// 所有关联的发货记录都已到场；没有关联发货时为 true
    pub fn at_venue(&self, shipments: &[SponsorShipment]) -> bool {
        self.linked(shipments).all(|shipment| shipment.available)
    }
}

/// 物料及其送达 / 到场状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwagStatus {
    #[serde(flatten)]
    pub swag: SponsorSwag,
    pub delivered: bool,
    pub at_venue: bool,
}
