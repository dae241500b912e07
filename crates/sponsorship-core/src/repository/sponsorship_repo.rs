//! 赞助仓储
//!
//! 基于 Postgres 的赞助聚合读写。聚合写入在单个事务内完成，
//! 运单号唯一性由唯一索引兜底，冲突时转换为校验错误。

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::traits::{RemovedChildren, SponsorshipRepositoryTrait};
use crate::error::{Result, SponsorshipError};
use crate::models::{
    Conference, SponsorShipment, SponsorSwag, Sponsorship, SponsorshipAggregate,
    SponsorshipLevel, SponsorshipState,
};

/// 运单号唯一约束名
pub const TRACK_NO_CONSTRAINT: &str = "uq_sponsor_shipments_track_no";

const SHIPMENT_SELECT: &str = r#"
    SELECT s.id, s.sponsorship_id, s.carrier, s.track_no, s.boxes, s.dispatched_at,
           s.delivered, s.available,
           COALESCE(
               ARRAY_AGG(l.sponsor_swag_id ORDER BY l.sponsor_swag_id)
                   FILTER (WHERE l.sponsor_swag_id IS NOT NULL),
               '{}'
           ) AS swag_ids,
           s.created_at, s.updated_at
    FROM sponsor_shipments s
    LEFT JOIN sponsor_shipments_swags l ON l.sponsor_shipment_id = s.id
"#;

/// 唯一索引冲突转换为运单号已占用
fn map_write_error(err: sqlx::Error, track_no: &str) -> SponsorshipError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint() == Some(TRACK_NO_CONSTRAINT) {
            return SponsorshipError::TrackingNumberTaken(track_no.to_string());
        }
    }
    SponsorshipError::Database(err)
}

/// 赞助仓储
pub struct SponsorshipRepository {
    pool: PgPool,
}

impl SponsorshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 读取 ====================

    /// 为一批赞助记录加载物料和发货子集合
    async fn load_children(
        &self,
        sponsorships: Vec<Sponsorship>,
    ) -> Result<Vec<SponsorshipAggregate>> {
        if sponsorships.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = sponsorships.iter().map(|s| s.id).collect();

        let swags = sqlx::query_as::<_, SponsorSwag>(
            r#"
            SELECT id, sponsorship_id, name, quantity, created_at, updated_at
            FROM sponsor_swags
            WHERE sponsorship_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let shipments = sqlx::query_as::<_, SponsorShipment>(&format!(
            "{SHIPMENT_SELECT} WHERE s.sponsorship_id = ANY($1) GROUP BY s.id ORDER BY s.id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut swags_by_owner: HashMap<i64, Vec<SponsorSwag>> = HashMap::new();
        for swag in swags {
            swags_by_owner.entry(swag.sponsorship_id).or_default().push(swag);
        }
        let mut shipments_by_owner: HashMap<i64, Vec<SponsorShipment>> = HashMap::new();
        for shipment in shipments {
            shipments_by_owner
                .entry(shipment.sponsorship_id)
                .or_default()
                .push(shipment);
        }

        Ok(sponsorships
            .into_iter()
            .map(|sponsorship| {
                let id = sponsorship.id;
                SponsorshipAggregate {
                    sponsorship,
                    swags: swags_by_owner.remove(&id).unwrap_or_default(),
                    shipments: shipments_by_owner.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<SponsorshipAggregate> {
        let sponsorship = sqlx::query_as::<_, Sponsorship>(
            r#"
            SELECT id, conference_id, sponsorship_level_id, submitter_id, name, description,
                   website_url, email, picture, has_swag, has_banner, paid, amount,
                   invoice_name, invoice_address, invoice_vat, invoice_sent_at, state,
                   created_at, updated_at
            FROM sponsorships
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(SponsorshipError::SponsorshipNotFound(id))?;

        self.load_children(vec![sponsorship])
            .await?
            .pop()
            .ok_or(SponsorshipError::SponsorshipNotFound(id))
    }

    async fn find_shipment(&self, shipment_id: i64) -> Result<Option<SponsorShipment>> {
        let shipment = sqlx::query_as::<_, SponsorShipment>(&format!(
            "{SHIPMENT_SELECT} WHERE s.id = $1 GROUP BY s.id"
        ))
        .bind(shipment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shipment)
    }

    // ==================== 写入 ====================

    async fn insert_swag(
        tx: &mut Transaction<'_, Postgres>,
        sponsorship_id: i64,
        swag: &SponsorSwag,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sponsor_swags (sponsorship_id, name, quantity)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(sponsorship_id)
        .bind(swag.name.trim())
        .bind(swag.quantity)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    async fn insert_shipment(
        tx: &mut Transaction<'_, Postgres>,
        sponsorship_id: i64,
        shipment: &SponsorShipment,
    ) -> Result<i64> {
        let track_no = shipment.track_no.trim();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sponsor_shipments
                (sponsorship_id, carrier, track_no, boxes, dispatched_at, delivered, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(sponsorship_id)
        .bind(shipment.carrier.trim())
        .bind(track_no)
        .bind(shipment.boxes)
        .bind(shipment.dispatched_at)
        .bind(shipment.delivered)
        .bind(shipment.available)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_write_error(e, track_no))?;

        Self::link_swags(tx, id, &shipment.swag_ids).await?;
        Ok(id)
    }

    async fn link_swags(
        tx: &mut Transaction<'_, Postgres>,
        shipment_id: i64,
        swag_ids: &[i64],
    ) -> Result<()> {
        if swag_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO sponsor_shipments_swags (sponsor_shipment_id, sponsor_swag_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(shipment_id)
        .bind(swag_ids)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SponsorshipRepositoryTrait for SponsorshipRepository {
    async fn find_conference(&self, short_title: &str) -> Result<Option<Conference>> {
        let conference = sqlx::query_as::<_, Conference>(
            r#"
            SELECT id, short_title, title
            FROM conferences
            WHERE short_title = $1
            "#,
        )
        .bind(short_title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conference)
    }

    async fn list_levels(&self, conference_id: i64) -> Result<Vec<SponsorshipLevel>> {
        let levels = sqlx::query_as::<_, SponsorshipLevel>(
            r#"
            SELECT id, conference_id, title, position
            FROM sponsorship_levels
            WHERE conference_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(conference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    async fn list(
        &self,
        conference_id: i64,
        submitter_id: Option<i64>,
    ) -> Result<Vec<SponsorshipAggregate>> {
        let sponsorships = sqlx::query_as::<_, Sponsorship>(
            r#"
            SELECT id, conference_id, sponsorship_level_id, submitter_id, name, description,
                   website_url, email, picture, has_swag, has_banner, paid, amount,
                   invoice_name, invoice_address, invoice_vat, invoice_sent_at, state,
                   created_at, updated_at
            FROM sponsorships
            WHERE conference_id = $1
              AND ($2::BIGINT IS NULL OR submitter_id = $2)
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(conference_id)
        .bind(submitter_id)
        .fetch_all(&self.pool)
        .await?;

        self.load_children(sponsorships).await
    }

    async fn count_by_state(
        &self,
        conference_id: i64,
        submitter_id: Option<i64>,
    ) -> Result<Vec<(SponsorshipState, i64)>> {
        let rows = sqlx::query_as::<_, (SponsorshipState, i64)>(
            r#"
            SELECT state, COUNT(*)
            FROM sponsorships
            WHERE conference_id = $1
              AND ($2::BIGINT IS NULL OR submitter_id = $2)
            GROUP BY state
            "#,
        )
        .bind(conference_id)
        .bind(submitter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find(&self, conference_id: i64, id: i64) -> Result<Option<SponsorshipAggregate>> {
        let sponsorship = sqlx::query_as::<_, Sponsorship>(
            r#"
            SELECT id, conference_id, sponsorship_level_id, submitter_id, name, description,
                   website_url, email, picture, has_swag, has_banner, paid, amount,
                   invoice_name, invoice_address, invoice_vat, invoice_sent_at, state,
                   created_at, updated_at
            FROM sponsorships
            WHERE conference_id = $1 AND id = $2
            "#,
        )
        .bind(conference_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match sponsorship {
            Some(sponsorship) => Ok(self.load_children(vec![sponsorship]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn tracking_number_taken(
        &self,
        track_no: &str,
        exclude_shipment_id: Option<i64>,
    ) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sponsor_shipments
                WHERE track_no = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(track_no.trim())
        .bind(exclude_shipment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn insert(&self, aggregate: &SponsorshipAggregate) -> Result<SponsorshipAggregate> {
        let s = &aggregate.sponsorship;
        let mut tx = self.pool.begin().await?;

        let sponsorship_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sponsorships
                (conference_id, sponsorship_level_id, submitter_id, name, description,
                 website_url, email, picture, has_swag, has_banner, paid, amount,
                 invoice_name, invoice_address, invoice_vat, invoice_sent_at, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            "#,
        )
        .bind(s.conference_id)
        .bind(s.sponsorship_level_id)
        .bind(s.submitter_id)
        .bind(s.name.trim())
        .bind(&s.description)
        .bind(&s.website_url)
        .bind(&s.email)
        .bind(&s.picture)
        .bind(s.has_swag)
        .bind(s.has_banner)
        .bind(s.paid)
        .bind(s.amount)
        .bind(&s.invoice_name)
        .bind(&s.invoice_address)
        .bind(&s.invoice_vat)
        .bind(s.invoice_sent_at)
        .bind(s.state)
        .fetch_one(&mut *tx)
        .await?;

        for swag in &aggregate.swags {
            Self::insert_swag(&mut tx, sponsorship_id, swag).await?;
        }
        for shipment in &aggregate.shipments {
            Self::insert_shipment(&mut tx, sponsorship_id, shipment).await?;
        }

        tx.commit().await?;
        debug!(sponsorship_id, "Sponsorship inserted");

        self.find_by_id(sponsorship_id).await
    }

    async fn update(
        &self,
        aggregate: &SponsorshipAggregate,
        removed: &RemovedChildren,
    ) -> Result<SponsorshipAggregate> {
        let s = &aggregate.sponsorship;
        let mut tx = self.pool.begin().await?;

        // 字段没有变化时不刷新 updated_at
        sqlx::query(
            r#"
            UPDATE sponsorships
            SET sponsorship_level_id = $2, name = $3, description = $4, website_url = $5,
                email = $6, picture = $7, has_swag = $8, has_banner = $9, paid = $10,
                amount = $11, invoice_name = $12, invoice_address = $13, invoice_vat = $14,
                invoice_sent_at = $15, state = $16, updated_at = NOW()
            WHERE id = $1
              AND (sponsorship_level_id, name, description, website_url, email, picture,
                   has_swag, has_banner, paid, amount, invoice_name, invoice_address,
                   invoice_vat, invoice_sent_at, state)
                  IS DISTINCT FROM
                  ($2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(s.id)
        .bind(s.sponsorship_level_id)
        .bind(s.name.trim())
        .bind(&s.description)
        .bind(&s.website_url)
        .bind(&s.email)
        .bind(&s.picture)
        .bind(s.has_swag)
        .bind(s.has_banner)
        .bind(s.paid)
        .bind(s.amount)
        .bind(&s.invoice_name)
        .bind(&s.invoice_address)
        .bind(&s.invoice_vat)
        .bind(s.invoice_sent_at)
        .bind(s.state)
        .execute(&mut *tx)
        .await?;

        if !removed.shipment_ids.is_empty() {
            sqlx::query("DELETE FROM sponsor_shipments WHERE sponsorship_id = $1 AND id = ANY($2)")
                .bind(s.id)
                .bind(&removed.shipment_ids)
                .execute(&mut *tx)
                .await?;
        }
        if !removed.swag_ids.is_empty() {
            sqlx::query("DELETE FROM sponsor_swags WHERE sponsorship_id = $1 AND id = ANY($2)")
                .bind(s.id)
                .bind(&removed.swag_ids)
                .execute(&mut *tx)
                .await?;
        }

        for swag in &aggregate.swags {
            if swag.id == 0 {
                Self::insert_swag(&mut tx, s.id, swag).await?;
                continue;
            }
            sqlx::query(
                r#"
                UPDATE sponsor_swags
                SET name = $3, quantity = $4, updated_at = NOW()
                WHERE id = $1 AND sponsorship_id = $2
                  AND (name, quantity) IS DISTINCT FROM ($3, $4)
                "#,
            )
            .bind(swag.id)
            .bind(s.id)
            .bind(swag.name.trim())
            .bind(swag.quantity)
            .execute(&mut *tx)
            .await?;
        }

        for shipment in &aggregate.shipments {
            if shipment.id == 0 {
                Self::insert_shipment(&mut tx, s.id, shipment).await?;
                continue;
            }
            let track_no = shipment.track_no.trim();
            sqlx::query(
                r#"
                UPDATE sponsor_shipments
                SET carrier = $3, track_no = $4, boxes = $5, dispatched_at = $6,
                    delivered = $7, available = $8, updated_at = NOW()
                WHERE id = $1 AND sponsorship_id = $2
                  AND (carrier, track_no, boxes, dispatched_at, delivered, available)
                      IS DISTINCT FROM ($3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(shipment.id)
            .bind(s.id)
            .bind(shipment.carrier.trim())
            .bind(track_no)
            .bind(shipment.boxes)
            .bind(shipment.dispatched_at)
            .bind(shipment.delivered)
            .bind(shipment.available)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, track_no))?;

            sqlx::query(
                r#"
                DELETE FROM sponsor_shipments_swags
                WHERE sponsor_shipment_id = $1 AND NOT (sponsor_swag_id = ANY($2))
                "#,
            )
            .bind(shipment.id)
            .bind(&shipment.swag_ids)
            .execute(&mut *tx)
            .await?;
            Self::link_swags(&mut tx, shipment.id, &shipment.swag_ids).await?;
        }

        tx.commit().await?;
        debug!(sponsorship_id = s.id, "Sponsorship updated");

        self.find_by_id(s.id).await
    }

    async fn save_state(&self, id: i64, state: SponsorshipState) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sponsorships
            SET state = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SponsorshipError::SponsorshipNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM sponsorships WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SponsorshipError::SponsorshipNotFound(id));
        }
        Ok(())
    }

    async fn save_arrival(
        &self,
        shipment_id: i64,
        delivered: bool,
        available: bool,
    ) -> Result<SponsorShipment> {
        sqlx::query(
            r#"
            UPDATE sponsor_shipments
            SET delivered = $2, available = $3, updated_at = NOW()
            WHERE id = $1 AND (delivered, available) IS DISTINCT FROM ($2, $3)
            "#,
        )
        .bind(shipment_id)
        .bind(delivered)
        .bind(available)
        .execute(&self.pool)
        .await?;

        self.find_shipment(shipment_id)
            .await?
            .ok_or(SponsorshipError::ShipmentNotFound(shipment_id))
    }
}
