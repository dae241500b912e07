//! 内存赞助仓储
//!
//! 用于本地开发和服务层测试，行为与 Postgres 实现保持一致：
//! 运单号全局唯一、删除级联、字段未变化时不刷新 updated_at。

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::traits::{RemovedChildren, SponsorshipRepositoryTrait};
use crate::error::{Result, SponsorshipError};
use crate::models::{
    Conference, SponsorShipment, SponsorSwag, SponsorshipAggregate, SponsorshipLevel,
    SponsorshipState,
};

/// 内存赞助仓储
pub struct MemorySponsorshipRepository {
    conferences: DashMap<String, Conference>,
    levels: DashMap<i64, Vec<SponsorshipLevel>>,
    sponsorships: DashMap<i64, SponsorshipAggregate>,
    next_id: AtomicI64,
    /// 串行化写操作，保证运单号检查与写入之间不被插入
    write_lock: Mutex<()>,
}

impl Default for MemorySponsorshipRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySponsorshipRepository {
    pub fn new() -> Self {
        Self {
            conferences: DashMap::new(),
            levels: DashMap::new(),
            sponsorships: DashMap::new(),
            next_id: AtomicI64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 添加会议
    pub fn add_conference(&self, short_title: &str, title: &str) -> Conference {
        let conference = Conference {
            id: self.next_id(),
            short_title: short_title.to_string(),
            title: title.to_string(),
        };
        self.conferences
            .insert(short_title.to_string(), conference.clone());
        conference
    }

    /// 为会议添加赞助等级
    pub fn add_level(&self, conference_id: i64, title: &str) -> SponsorshipLevel {
        let mut levels = self.levels.entry(conference_id).or_default();
        let level = SponsorshipLevel {
            id: self.next_id(),
            conference_id,
            title: title.to_string(),
            position: levels.len() as i32,
        };
        levels.push(level.clone());
        level
    }

    /// 当前存储的赞助记录数
    pub fn len(&self) -> usize {
        self.sponsorships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sponsorships.is_empty()
    }

    fn track_no_in_use(&self, track_no: &str, ignore_sponsorship: Option<i64>) -> bool {
        self.sponsorships.iter().any(|entry| {
            Some(*entry.key()) != ignore_sponsorship
                && entry
                    .shipments
                    .iter()
                    .any(|shipment| shipment.track_no == track_no)
        })
    }

    /// 写入前检查本聚合的运单号是否与其他聚合冲突
    fn ensure_unique_track_numbers(
        &self,
        aggregate: &SponsorshipAggregate,
        ignore_sponsorship: Option<i64>,
    ) -> Result<()> {
        for shipment in &aggregate.shipments {
            let track_no = shipment.track_no.trim();
            if self.track_no_in_use(track_no, ignore_sponsorship) {
                return Err(SponsorshipError::TrackingNumberTaken(track_no.to_string()));
            }
        }
        Ok(())
    }

    fn persist_swag(
        &self,
        sponsorship_id: i64,
        swag: &SponsorSwag,
        previous: Option<&SponsorSwag>,
    ) -> SponsorSwag {
        let now = Utc::now();
        match previous {
            Some(previous) => {
                let changed =
                    previous.name != swag.name.trim() || previous.quantity != swag.quantity;
                SponsorSwag {
                    id: previous.id,
                    sponsorship_id,
                    name: swag.name.trim().to_string(),
                    quantity: swag.quantity,
                    created_at: previous.created_at,
                    updated_at: if changed { now } else { previous.updated_at },
                }
            }
            None => SponsorSwag {
                id: self.next_id(),
                sponsorship_id,
                name: swag.name.trim().to_string(),
                quantity: swag.quantity,
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn persist_shipment(
        &self,
        sponsorship_id: i64,
        shipment: &SponsorShipment,
        previous: Option<&SponsorShipment>,
    ) -> SponsorShipment {
        let now = Utc::now();
        let mut stored = SponsorShipment {
            sponsorship_id,
            carrier: shipment.carrier.trim().to_string(),
            track_no: shipment.track_no.trim().to_string(),
            ..shipment.clone()
        };
        stored.swag_ids.sort_unstable();
        stored.swag_ids.dedup();

        match previous {
            Some(previous) => {
                let changed = previous.carrier != stored.carrier
                    || previous.track_no != stored.track_no
                    || previous.boxes != stored.boxes
                    || previous.dispatched_at != stored.dispatched_at
                    || previous.delivered != stored.delivered
                    || previous.available != stored.available;
                stored.id = previous.id;
                stored.created_at = previous.created_at;
                stored.updated_at = if changed { now } else { previous.updated_at };
            }
            None => {
                stored.id = self.next_id();
                stored.created_at = now;
                stored.updated_at = now;
            }
        }
        stored
    }
}

#[async_trait]
impl SponsorshipRepositoryTrait for MemorySponsorshipRepository {
    async fn find_conference(&self, short_title: &str) -> Result<Option<Conference>> {
        Ok(self.conferences.get(short_title).map(|c| c.clone()))
    }

    async fn list_levels(&self, conference_id: i64) -> Result<Vec<SponsorshipLevel>> {
        Ok(self
            .levels
            .get(&conference_id)
            .map(|levels| levels.clone())
            .unwrap_or_default())
    }

    async fn list(
        &self,
        conference_id: i64,
        submitter_id: Option<i64>,
    ) -> Result<Vec<SponsorshipAggregate>> {
        let mut items: Vec<SponsorshipAggregate> = self
            .sponsorships
            .iter()
            .filter(|entry| entry.sponsorship.conference_id == conference_id)
            .filter(|entry| {
                submitter_id.is_none() || entry.sponsorship.submitter_id == submitter_id
            })
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| {
            a.sponsorship
                .name
                .cmp(&b.sponsorship.name)
                .then(a.id().cmp(&b.id()))
        });
        Ok(items)
    }

    async fn count_by_state(
        &self,
        conference_id: i64,
        submitter_id: Option<i64>,
    ) -> Result<Vec<(SponsorshipState, i64)>> {
        let items = self.list(conference_id, submitter_id).await?;
        Ok(SponsorshipState::ALL
            .iter()
            .map(|state| {
                let count = items
                    .iter()
                    .filter(|item| item.sponsorship.state == *state)
                    .count() as i64;
                (*state, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    async fn find(&self, conference_id: i64, id: i64) -> Result<Option<SponsorshipAggregate>> {
        Ok(self
            .sponsorships
            .get(&id)
            .filter(|entry| entry.sponsorship.conference_id == conference_id)
            .map(|entry| entry.value().clone()))
    }

    async fn tracking_number_taken(
        &self,
        track_no: &str,
        exclude_shipment_id: Option<i64>,
    ) -> Result<bool> {
        let track_no = track_no.trim();
        Ok(self.sponsorships.iter().any(|entry| {
            entry.shipments.iter().any(|shipment| {
                shipment.track_no == track_no && Some(shipment.id) != exclude_shipment_id
            })
        }))
    }

    async fn insert(&self, aggregate: &SponsorshipAggregate) -> Result<SponsorshipAggregate> {
        let _guard = self.write_lock.lock();
        self.ensure_unique_track_numbers(aggregate, None)?;

        let now = Utc::now();
        let id = self.next_id();
        let mut sponsorship = aggregate.sponsorship.clone();
        sponsorship.id = id;
        sponsorship.name = sponsorship.name.trim().to_string();
        sponsorship.created_at = now;
        sponsorship.updated_at = now;

        let stored = SponsorshipAggregate {
            sponsorship,
            swags: aggregate
                .swags
                .iter()
                .map(|swag| self.persist_swag(id, swag, None))
                .collect(),
            shipments: aggregate
                .shipments
                .iter()
                .map(|shipment| self.persist_shipment(id, shipment, None))
                .collect(),
        };

        self.sponsorships.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        aggregate: &SponsorshipAggregate,
        removed: &RemovedChildren,
    ) -> Result<SponsorshipAggregate> {
        let _guard = self.write_lock.lock();
        let id = aggregate.id();
        let previous = self
            .sponsorships
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(SponsorshipError::SponsorshipNotFound(id))?;
        self.ensure_unique_track_numbers(aggregate, Some(id))?;

        let mut sponsorship = aggregate.sponsorship.clone();
        sponsorship.name = sponsorship.name.trim().to_string();
        sponsorship.created_at = previous.sponsorship.created_at;
        sponsorship.submitter_id = previous.sponsorship.submitter_id;
        sponsorship.updated_at = previous.sponsorship.updated_at;
        if sponsorship != previous.sponsorship {
            sponsorship.updated_at = Utc::now();
        }

        let swags: Vec<SponsorSwag> = aggregate
            .swags
            .iter()
            .filter(|swag| !removed.swag_ids.contains(&swag.id))
            .map(|swag| {
                let before = previous.swags.iter().find(|p| swag.id > 0 && p.id == swag.id);
                self.persist_swag(id, swag, before)
            })
            .collect();

        let shipments: Vec<SponsorShipment> = aggregate
            .shipments
            .iter()
            .filter(|shipment| !removed.shipment_ids.contains(&shipment.id))
            .map(|shipment| {
                let before = previous
                    .shipments
                    .iter()
                    .find(|p| shipment.id > 0 && p.id == shipment.id);
                let mut stored = self.persist_shipment(id, shipment, before);
                stored.swag_ids.retain(|swag_id| !removed.swag_ids.contains(swag_id));
                stored
            })
            .collect();

        let stored = SponsorshipAggregate {
            sponsorship,
            swags,
            shipments,
        };
        self.sponsorships.insert(id, stored.clone());
        Ok(stored)
    }

    async fn save_state(&self, id: i64, state: SponsorshipState) -> Result<()> {
        let mut entry = self
            .sponsorships
            .get_mut(&id)
            .ok_or(SponsorshipError::SponsorshipNotFound(id))?;
        entry.sponsorship.state = state;
        entry.sponsorship.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.sponsorships
            .remove(&id)
            .map(|_| ())
            .ok_or(SponsorshipError::SponsorshipNotFound(id))
    }

    async fn save_arrival(
        &self,
        shipment_id: i64,
        delivered: bool,
        available: bool,
    ) -> Result<SponsorShipment> {
        let _guard = self.write_lock.lock();
        for mut entry in self.sponsorships.iter_mut() {
            if let Some(shipment) = entry
                .shipments
                .iter_mut()
                .find(|shipment| shipment.id == shipment_id)
            {
                if shipment.delivered != delivered || shipment.available != available {
                    shipment.delivered = delivered;
                    shipment.available = available;
                    shipment.updated_at = Utc::now();
                }
                return Ok(shipment.clone());
            }
        }
        Err(SponsorshipError::ShipmentNotFound(shipment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sponsorship;

    fn aggregate(conference_id: i64, name: &str, track_numbers: &[&str]) -> SponsorshipAggregate {
        let mut sponsorship = Sponsorship::draft(conference_id, None);
        sponsorship.name = name.to_string();
        let mut aggregate = SponsorshipAggregate::new(sponsorship);
        for track_no in track_numbers {
            aggregate
                .shipments
                .push(SponsorShipment::new(0, "DHL", *track_no, Some(1)));
        }
        aggregate
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let repo = MemorySponsorshipRepository::new();
        let conference = repo.add_conference("osc24", "Open Source Conference 2024");

        let mut input = aggregate(conference.id, "Acme", &["T-1"]);
        input.swags.push(SponsorSwag::new(0, "Stickers", Some(100)));

        let stored = repo.insert(&input).await.unwrap();
        assert!(stored.id() > 0);
        assert!(stored.swags[0].id > 0);
        assert_eq!(stored.swags[0].sponsorship_id, stored.id());
        assert_eq!(stored.shipments[0].sponsorship_id, stored.id());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_track_no_rejected() {
        let repo = MemorySponsorshipRepository::new();
        let conference = repo.add_conference("osc24", "OSC");

        repo.insert(&aggregate(conference.id, "Acme", &["T-1"]))
            .await
            .unwrap();
        let result = repo.insert(&aggregate(conference.id, "Globex", &["T-1"])).await;

        assert!(matches!(
            result,
            Err(SponsorshipError::TrackingNumberTaken(ref n)) if n == "T-1"
        ));
        assert_eq!(repo.len(), 1);
        assert!(repo.tracking_number_taken("T-1", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_without_changes_keeps_timestamps() {
        let repo = MemorySponsorshipRepository::new();
        let conference = repo.add_conference("osc24", "OSC");
        let mut input = aggregate(conference.id, "Acme", &["T-1"]);
        input.swags.push(SponsorSwag::new(0, "Stickers", None));
        let stored = repo.insert(&input).await.unwrap();

        let updated = repo
            .update(&stored, &RemovedChildren::default())
            .await
            .unwrap();

        assert_eq!(updated.sponsorship.updated_at, stored.sponsorship.updated_at);
        assert_eq!(updated.swags[0].updated_at, stored.swags[0].updated_at);
        assert_eq!(updated.shipments[0].updated_at, stored.shipments[0].updated_at);
    }

    #[tokio::test]
    async fn test_count_by_state_scoped_by_submitter() {
        let repo = MemorySponsorshipRepository::new();
        let conference = repo.add_conference("osc24", "OSC");

        let mut mine = aggregate(conference.id, "Mine", &[]);
        mine.sponsorship.submitter_id = Some(7);
        repo.insert(&mine).await.unwrap();
        repo.insert(&aggregate(conference.id, "Other", &[]))
            .await
            .unwrap();

        let all = repo.count_by_state(conference.id, None).await.unwrap();
        let own = repo.count_by_state(conference.id, Some(7)).await.unwrap();

        assert_eq!(all, vec![(SponsorshipState::ToContact, 2)]);
        assert_eq!(own, vec![(SponsorshipState::ToContact, 1)]);
    }

    #[tokio::test]
    async fn test_save_arrival_unknown_shipment() {
        let repo = MemorySponsorshipRepository::new();
        let result = repo.save_arrival(999, true, true).await;
        assert!(matches!(result, Err(SponsorshipError::ShipmentNotFound(999))));
    }
}
