//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Conference, SponsorShipment, SponsorshipAggregate, SponsorshipLevel, SponsorshipState,
};

/// 更新聚合时被删除的子记录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedChildren {
    pub swag_ids: Vec<i64>,
    pub shipment_ids: Vec<i64>,
}

impl RemovedChildren {
    pub fn is_empty(&self) -> bool {
        self.swag_ids.is_empty() && self.shipment_ids.is_empty()
    }
}

/// 赞助仓储接口
///
/// `submitter_id` 为 Some 时只作用于该提交者自己的记录
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SponsorshipRepositoryTrait: Send + Sync {
    // 会议与等级
    async fn find_conference(&self, short_title: &str) -> Result<Option<Conference>>;
    async fn list_levels(&self, conference_id: i64) -> Result<Vec<SponsorshipLevel>>;

    // 查询
    async fn list(
        &self,
        conference_id: i64,
        submitter_id: Option<i64>,
    ) -> Result<Vec<SponsorshipAggregate>>;
    async fn count_by_state(
        &self,
        conference_id: i64,
        submitter_id: Option<i64>,
    ) -> Result<Vec<(SponsorshipState, i64)>>;
    async fn find(&self, conference_id: i64, id: i64) -> Result<Option<SponsorshipAggregate>>;

    /// 运单号是否已被其他发货记录占用
    async fn tracking_number_taken(
        &self,
        track_no: &str,
        exclude_shipment_id: Option<i64>,
    ) -> Result<bool>;

    // 写入（单事务）
    async fn insert(&self, aggregate: &SponsorshipAggregate) -> Result<SponsorshipAggregate>;
    async fn update(
        &self,
        aggregate: &SponsorshipAggregate,
        removed: &RemovedChildren,
    ) -> Result<SponsorshipAggregate>;
    async fn save_state(&self, id: i64, state: SponsorshipState) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;

    /// 到货跟踪：更新发货记录的送达 / 到场标记
    async fn save_arrival(
        &self,
        shipment_id: i64,
        delivered: bool,
        available: bool,
    ) -> Result<SponsorShipment>;
}
