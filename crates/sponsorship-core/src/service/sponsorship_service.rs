//! 赞助服务
//!
//! 处理赞助的核心业务流程：
//! - 会议定位与门面授权（任何写操作之前）
//! - 聚合整体校验（字段、嵌套物料与发货、运单号唯一性、图片令牌）
//! - 单事务落库与字段级审计
//! - 状态流转、邮件入队、到货跟踪
//!
//! ## 保存流程
//!
//! 1. 授权 -> 2. 赋值 -> 3. 校验 -> 4. 转存图片 -> 5. 事务写入 -> 6. 审计

use std::sync::Arc;

use chrono::Utc;
use sponsor_shared::observability::metrics;
use tracing::{error, info, instrument, warn};

use crate::access::{AccessFacade, Actor, SponsorshipAccess};
use crate::audit::{AuditEntry, AuditEvent, AuditLog, Auditable};
use crate::error::{Result, SponsorshipError};
use crate::lifecycle::{Lifecycle, StateCounts};
use crate::models::{
    SponsorShipment, SponsorSwag, Sponsorship, SponsorshipAggregate, SponsorshipLevel,
    StateTransition, SwagStatus,
};
use crate::notification::{EmailQueue, SponsorEmail};
use crate::repository::{RemovedChildren, SponsorshipRepositoryTrait};
use crate::service::dto::{
    EmailDraft, EmailMessage, Mutation, NewSponsorshipForm, ShipmentArrival, ShipmentAttributes,
    SponsorshipAttributes, SponsorshipIndex, SwagAttributes, normalize,
};
use crate::storage::{PictureStore, PictureUpload};
use crate::validation::{self, ValidationFailure};

/// 赞助服务
pub struct SponsorshipService {
    repo: Arc<dyn SponsorshipRepositoryTrait>,
    audit: Arc<dyn AuditLog>,
    mailer: Arc<dyn EmailQueue>,
    pictures: Arc<dyn PictureStore>,
}

impl SponsorshipService {
    pub fn new(
        repo: Arc<dyn SponsorshipRepositoryTrait>,
        audit: Arc<dyn AuditLog>,
        mailer: Arc<dyn EmailQueue>,
        pictures: Arc<dyn PictureStore>,
    ) -> Self {
        Self {
            repo,
            audit,
            mailer,
            pictures,
        }
    }

    // ==================== 授权 ====================

    /// 定位会议并通过门面授权
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub async fn access<F: AccessFacade>(
        &self,
        actor: &Actor,
        short_title: &str,
    ) -> Result<SponsorshipAccess> {
        let conference = self
            .repo
            .find_conference(short_title)
            .await?
            .ok_or_else(|| SponsorshipError::ConferenceNotFound(short_title.to_string()))?;

        F::access(actor, conference).inspect_err(|e| {
            warn!(user_id = actor.user_id, error = %e, "Sponsorship access denied");
        })
    }

    // ==================== 查询 ====================

    /// 赞助列表及看板计数
    #[instrument(skip(self, access), fields(conference = %access.conference.short_title))]
    pub async fn index(&self, access: &SponsorshipAccess) -> Result<SponsorshipIndex> {
        self.levels(access).await?;

        let sponsorships = self
            .repo
            .list(access.conference.id, access.scope.submitter_filter())
            .await?;
        let counts = self.state_counts(access).await?;

        Ok(SponsorshipIndex {
            sponsorships,
            counts,
        })
    }

    /// 看板计数：待联系、已联系、洽谈中
    pub async fn state_counts(&self, access: &SponsorshipAccess) -> Result<StateCounts> {
        let tally = self
            .repo
            .count_by_state(access.conference.id, access.scope.submitter_filter())
            .await?;
        Ok(StateCounts::from_tally(tally))
    }

    /// 新建表单
    pub async fn new_form(&self, access: &SponsorshipAccess) -> Result<NewSponsorshipForm> {
        let levels = self.levels(access).await?;
        Ok(NewSponsorshipForm {
            sponsorship: Sponsorship::draft(access.conference.id, access.new_submitter),
            levels,
        })
    }

    pub async fn show(&self, access: &SponsorshipAccess, id: i64) -> Result<SponsorshipAggregate> {
        self.load(access, id).await
    }

    /// 物料列表及送达 / 到场状态
    pub async fn swag_statuses(
        &self,
        access: &SponsorshipAccess,
        id: i64,
    ) -> Result<Vec<SwagStatus>> {
        Ok(self.load(access, id).await?.swag_statuses())
    }

    // ==================== 增删改 ====================

    #[instrument(skip(self, access, attrs), fields(conference = %access.conference.short_title))]
    pub async fn create(
        &self,
        access: &SponsorshipAccess,
        attrs: SponsorshipAttributes,
    ) -> Result<SponsorshipAggregate> {
        let result = self.create_inner(access, attrs).await;
        Self::observe(Mutation::Create, &result);
        result
    }

    async fn create_inner(
        &self,
        access: &SponsorshipAccess,
        attrs: SponsorshipAttributes,
    ) -> Result<SponsorshipAggregate> {
        let mut aggregate = SponsorshipAggregate::new(Sponsorship::draft(
            access.conference.id,
            access.new_submitter,
        ));
        let picture_cache = attrs.picture_cache.clone();
        Self::assign(&mut aggregate, attrs)?;

        self.validate(access, &aggregate).await?;
        let promoted = self.promote_picture(&mut aggregate, picture_cache).await?;

        let stored = match self.repo.insert(&aggregate).await {
            Ok(stored) => stored,
            Err(e) => {
                self.rollback_picture(&aggregate, promoted.as_deref()).await;
                return Err(Self::tracking_race(&aggregate, e));
            }
        };
        self.release_picture(promoted.as_deref()).await;

        self.audit_changes(access, None, Some(&stored)).await;
        info!(
            sponsorship_id = stored.id(),
            conference = %access.conference.short_title,
            swags = stored.swags.len(),
            shipments = stored.shipments.len(),
            "Sponsorship created"
        );
        Ok(stored)
    }

    #[instrument(skip(self, access, attrs), fields(conference = %access.conference.short_title))]
    pub async fn update(
        &self,
        access: &SponsorshipAccess,
        id: i64,
        attrs: SponsorshipAttributes,
    ) -> Result<SponsorshipAggregate> {
        let result = self.update_inner(access, id, attrs).await;
        Self::observe(Mutation::Update, &result);
        result
    }

    async fn update_inner(
        &self,
        access: &SponsorshipAccess,
        id: i64,
        attrs: SponsorshipAttributes,
    ) -> Result<SponsorshipAggregate> {
        let before = self.load(access, id).await?;
        let mut aggregate = before.clone();
        let picture_cache = attrs.picture_cache.clone();
        let removed = Self::assign(&mut aggregate, attrs)?;

        self.validate(access, &aggregate).await?;
        let promoted = self.promote_picture(&mut aggregate, picture_cache).await?;

        let stored = match self.repo.update(&aggregate, &removed).await {
            Ok(stored) => stored,
            Err(e) => {
                self.rollback_picture(&aggregate, promoted.as_deref()).await;
                return Err(Self::tracking_race(&aggregate, e));
            }
        };
        self.release_picture(promoted.as_deref()).await;

        self.audit_changes(access, Some(&before), Some(&stored)).await;
        if before.sponsorship.picture != stored.sponsorship.picture {
            self.discard_picture(before.sponsorship.picture.as_deref()).await;
        }

        info!(
            sponsorship_id = id,
            removed_swags = removed.swag_ids.len(),
            removed_shipments = removed.shipment_ids.len(),
            "Sponsorship updated"
        );
        Ok(stored)
    }

    /// 删除赞助；仍有在途发货时拒绝
    #[instrument(skip(self, access), fields(conference = %access.conference.short_title))]
    pub async fn destroy(&self, access: &SponsorshipAccess, id: i64) -> Result<()> {
        let result = self.destroy_inner(access, id).await;
        Self::observe(Mutation::Destroy, &result);
        result
    }

    async fn destroy_inner(&self, access: &SponsorshipAccess, id: i64) -> Result<()> {
        let aggregate = self.load(access, id).await?;

        let in_transit = aggregate.shipments_in_transit().len();
        if in_transit > 0 {
            warn!(sponsorship_id = id, in_transit, "Refused to delete sponsorship");
            return Err(SponsorshipError::ShipmentsInTransit {
                sponsorship_id: id,
                count: in_transit,
            });
        }

        self.repo.delete(id).await?;
        self.audit_changes(access, Some(&aggregate), None).await;
        self.discard_picture(aggregate.sponsorship.picture.as_deref())
            .await;

        info!(sponsorship_id = id, "Sponsorship deleted");
        Ok(())
    }

    /// 暂存上传的 Logo，返回缓存令牌
    pub async fn stash_picture(
        &self,
        access: &SponsorshipAccess,
        upload: PictureUpload,
    ) -> Result<String> {
        let token = self.pictures.stash(upload).await?;
        info!(
            conference = %access.conference.short_title,
            user_id = access.actor_id,
            "Picture upload cached"
        );
        Ok(token)
    }

    // ==================== 状态流转 ====================

    /// 执行状态流转并整体校验后保存
    ///
    /// 没有终态限制，已取消的记录也可以直接确认
    #[instrument(skip(self, access), fields(conference = %access.conference.short_title))]
    pub async fn transition(
        &self,
        access: &SponsorshipAccess,
        id: i64,
        transition: StateTransition,
    ) -> Result<Sponsorship> {
        let mut aggregate = self.load(access, id).await?;
        let before = aggregate.sponsorship.clone();
        let previous = aggregate.sponsorship.apply(transition);

        let failure = aggregate.validate();
        if !failure.is_empty() {
            warn!(
                sponsorship_id = id,
                transition = ?transition,
                errors = %failure,
                "Sponsorship transition rejected"
            );
            return Err(failure.into());
        }

        let state = aggregate.sponsorship.state;
        self.repo.save_state(id, state).await?;
        aggregate.sponsorship.updated_at = Utc::now();

        self.audit_one(
            access,
            AuditEvent::Update,
            Some(&before),
            Some(&aggregate.sponsorship),
        )
        .await;
        metrics::record_transition(state.as_str());
        info!(
            sponsorship_id = id,
            from = %previous,
            to = %state,
            "Sponsorship state changed"
        );

        Ok(aggregate.sponsorship)
    }

    // ==================== 邮件 ====================

    /// 预填邮件表单
    pub async fn prepare_email(&self, access: &SponsorshipAccess, id: i64) -> Result<EmailDraft> {
        let aggregate = self.load(access, id).await?;
        Ok(EmailDraft {
            from: self.mailer.default_sender(),
            to: aggregate.sponsorship.email.clone(),
            recipient_name: aggregate.sponsorship.name,
        })
    }

    /// 邮件入队，返回提示语；不等待投递结果，也不修改赞助记录
    #[instrument(skip(self, access, message), fields(conference = %access.conference.short_title))]
    pub async fn send_email(
        &self,
        access: &SponsorshipAccess,
        id: i64,
        message: EmailMessage,
    ) -> Result<String> {
        let aggregate = self.load(access, id).await?;
        let sponsorship = &aggregate.sponsorship;

        let to = normalize(sponsorship.email.clone()).ok_or_else(|| {
            SponsorshipError::EmailFailed(format!("{} has no email address", sponsorship.name))
        })?;
        let from = normalize(message.from).unwrap_or_else(|| self.mailer.default_sender());

        let email = SponsorEmail {
            sponsorship_id: sponsorship.id,
            conference_short_title: access.conference.short_title.clone(),
            recipient_name: sponsorship.name.clone(),
            to: to.clone(),
            from,
            subject: message.subject,
            body: message.body,
            enqueued_at: Utc::now(),
        };

        self.mailer.enqueue(email).await.map_err(|e| match e {
            SponsorshipError::EmailFailed(_) => e,
            other => SponsorshipError::EmailFailed(other.to_string()),
        })?;

        info!(sponsorship_id = id, to = %to, "Sponsor email enqueued");
        Ok(format!("Email sent to {}({})", sponsorship.name, to))
    }

    // ==================== 到货跟踪 ====================

    /// 更新发货记录的送达 / 到场标记
    #[instrument(skip(self, access), fields(conference = %access.conference.short_title))]
    pub async fn record_arrival(
        &self,
        access: &SponsorshipAccess,
        sponsorship_id: i64,
        shipment_id: i64,
        arrival: ShipmentArrival,
    ) -> Result<SponsorShipment> {
        let aggregate = self.load(access, sponsorship_id).await?;
        let before = aggregate
            .shipments
            .iter()
            .find(|shipment| shipment.id == shipment_id)
            .cloned()
            .ok_or(SponsorshipError::ShipmentNotFound(shipment_id))?;

        let delivered = arrival.delivered.unwrap_or(before.delivered);
        let available = arrival.available.unwrap_or(before.available);
        let after = self
            .repo
            .save_arrival(shipment_id, delivered, available)
            .await?;

        self.audit_one(access, AuditEvent::Update, Some(&before), Some(&after))
            .await;
        info!(
            sponsorship_id,
            shipment_id, delivered, available, "Shipment arrival recorded"
        );
        Ok(after)
    }

    // ==================== 内部方法 ====================

    async fn levels(&self, access: &SponsorshipAccess) -> Result<Vec<SponsorshipLevel>> {
        let levels = self.repo.list_levels(access.conference.id).await?;
        if access.requires_levels && levels.is_empty() {
            return Err(SponsorshipError::SponsorshipLevelRequired);
        }
        Ok(levels)
    }

    /// 加载并检查访问范围
    async fn load(&self, access: &SponsorshipAccess, id: i64) -> Result<SponsorshipAggregate> {
        let aggregate = self
            .repo
            .find(access.conference.id, id)
            .await?
            .ok_or(SponsorshipError::SponsorshipNotFound(id))?;
        access.ensure_permits(&aggregate.sponsorship)?;
        Ok(aggregate)
    }

    /// 将提交的字段赋值到聚合，返回需要删除的子记录
    fn assign(
        aggregate: &mut SponsorshipAggregate,
        attrs: SponsorshipAttributes,
    ) -> Result<RemovedChildren> {
        let s = &mut aggregate.sponsorship;

        if let Some(name) = attrs.name {
            s.name = name.trim().to_string();
        }
        if let Some(description) = attrs.description {
            s.description = normalize(description);
        }
        if let Some(website_url) = attrs.website_url {
            s.website_url = normalize(website_url);
        }
        if let Some(level_id) = attrs.sponsorship_level_id {
            s.sponsorship_level_id = level_id;
        }
        if let Some(has_swag) = attrs.has_swag {
            s.has_swag = has_swag;
        }
        if let Some(has_banner) = attrs.has_banner {
            s.has_banner = has_banner;
        }
        if let Some(email) = attrs.email {
            s.email = normalize(email);
        }
        if let Some(state) = attrs.state {
            s.state = state;
        }
        if let Some(paid) = attrs.paid {
            s.paid = paid;
        }
        if let Some(amount) = attrs.amount {
            s.amount = amount;
        }
        if let Some(invoice_name) = attrs.invoice_name {
            s.invoice_name = normalize(invoice_name);
        }
        if let Some(invoice_address) = attrs.invoice_address {
            s.invoice_address = normalize(invoice_address);
        }
        if let Some(invoice_vat) = attrs.invoice_vat {
            s.invoice_vat = normalize(invoice_vat);
        }
        if let Some(invoice_sent_at) = attrs.invoice_sent_at {
            s.invoice_sent_at = invoice_sent_at;
        }

        let mut removed = RemovedChildren::default();
        Self::assign_swags(aggregate, attrs.swags, &mut removed)?;
        Self::assign_shipments(aggregate, attrs.shipments, &mut removed)?;
        Ok(removed)
    }

    fn assign_swags(
        aggregate: &mut SponsorshipAggregate,
        attrs: Vec<SwagAttributes>,
        removed: &mut RemovedChildren,
    ) -> Result<()> {
        let sponsorship_id = aggregate.id();

        for attr in attrs {
            let Some(id) = attr.id else {
                if !attr.destroy {
                    aggregate.swags.push(SponsorSwag::new(
                        sponsorship_id,
                        attr.name.unwrap_or_default(),
                        attr.quantity.flatten(),
                    ));
                }
                continue;
            };

            let index = aggregate
                .swags
                .iter()
                .position(|swag| swag.id == id)
                .ok_or(SponsorshipError::SwagNotFound(id))?;

            if attr.destroy {
                aggregate.swags.remove(index);
                for shipment in &mut aggregate.shipments {
                    shipment.swag_ids.retain(|swag_id| *swag_id != id);
                }
                removed.swag_ids.push(id);
                continue;
            }

            let swag = &mut aggregate.swags[index];
            if let Some(name) = attr.name {
                swag.name = name;
            }
            if let Some(quantity) = attr.quantity {
                swag.quantity = quantity;
            }
        }

        Ok(())
    }

    fn assign_shipments(
        aggregate: &mut SponsorshipAggregate,
        attrs: Vec<ShipmentAttributes>,
        removed: &mut RemovedChildren,
    ) -> Result<()> {
        let sponsorship_id = aggregate.id();

        for attr in attrs {
            let Some(id) = attr.id else {
                if !attr.destroy {
                    let mut shipment = SponsorShipment::new(
                        sponsorship_id,
                        attr.carrier.unwrap_or_default(),
                        attr.track_no.unwrap_or_default(),
                        attr.boxes.flatten(),
                    );
                    shipment.dispatched_at = attr.dispatched_at.flatten();
                    shipment.swag_ids = attr.swag_ids.unwrap_or_default();
                    aggregate.shipments.push(shipment);
                }
                continue;
            };

            let index = aggregate
                .shipments
                .iter()
                .position(|shipment| shipment.id == id)
                .ok_or(SponsorshipError::ShipmentNotFound(id))?;

            if attr.destroy {
                aggregate.shipments.remove(index);
                removed.shipment_ids.push(id);
                continue;
            }

            let shipment = &mut aggregate.shipments[index];
            if let Some(carrier) = attr.carrier {
                shipment.carrier = carrier;
            }
            if let Some(track_no) = attr.track_no {
                shipment.track_no = track_no;
            }
            if let Some(boxes) = attr.boxes {
                shipment.boxes = boxes;
            }
            if let Some(dispatched_at) = attr.dispatched_at {
                shipment.dispatched_at = dispatched_at;
            }
            if let Some(swag_ids) = attr.swag_ids {
                shipment.swag_ids = swag_ids;
            }
        }

        Ok(())
    }

    /// 整体校验：字段规则、赞助等级归属、运单号全局唯一
    async fn validate(
        &self,
        access: &SponsorshipAccess,
        aggregate: &SponsorshipAggregate,
    ) -> Result<()> {
        let mut failure = aggregate.validate();

        if let Some(level_id) = aggregate.sponsorship.sponsorship_level_id {
            let levels = self.repo.list_levels(access.conference.id).await?;
            if !levels.iter().any(|level| level.id == level_id) {
                failure.add(
                    "sponsorship_level_id",
                    "Sponsorship level is not available for this conference",
                );
            }
        }

        for (index, shipment) in aggregate.shipments.iter().enumerate() {
            let track_no = shipment.track_no.trim();
            let path = format!("shipments[{index}].track_no");
            if track_no.is_empty() || failure.has_error_on(&path) {
                continue;
            }

            let exclude = (shipment.id > 0).then_some(shipment.id);
            if self.repo.tracking_number_taken(track_no, exclude).await? {
                validation::tracking_number_taken(index + 1, &mut failure);
            }
        }

        if failure.is_empty() {
            Ok(())
        } else {
            warn!(
                conference = %access.conference.short_title,
                errors = %failure,
                "Sponsorship validation failed"
            );
            Err(failure.into())
        }
    }

    /// 将上传令牌转为永久引用，返回已转存的令牌
    async fn promote_picture(
        &self,
        aggregate: &mut SponsorshipAggregate,
        token: Option<String>,
    ) -> Result<Option<String>> {
        let Some(token) = normalize(token) else {
            return Ok(None);
        };

        match self.pictures.promote(&token).await? {
            Some(reference) => {
                aggregate.sponsorship.picture = Some(reference);
                Ok(Some(token))
            }
            None => Err(ValidationFailure::single(
                "picture",
                "Picture upload has expired or is unknown",
            )
            .into()),
        }
    }

    /// 写入失败：删除本次转存的文件，缓存留给重新提交
    async fn rollback_picture(&self, aggregate: &SponsorshipAggregate, token: Option<&str>) {
        if token.is_some() {
            self.discard_picture(aggregate.sponsorship.picture.as_deref())
                .await;
        }
    }

    async fn release_picture(&self, token: Option<&str>) {
        let Some(token) = token else {
            return;
        };
        if let Err(e) = self.pictures.release(token).await {
            warn!(token = %token, error = %e, "Failed to release picture upload");
        }
    }

    async fn discard_picture(&self, reference: Option<&str>) {
        let Some(reference) = reference else {
            return;
        };
        if let Err(e) = self.pictures.remove(reference).await {
            warn!(reference = %reference, error = %e, "Failed to remove picture");
        }
    }

    /// 并发写入越过服务端检查、被唯一索引拦截时，转换为同样的校验错误
    fn tracking_race(aggregate: &SponsorshipAggregate, err: SponsorshipError) -> SponsorshipError {
        let SponsorshipError::TrackingNumberTaken(track_no) = &err else {
            return err;
        };

        let mut failure = ValidationFailure::new();
        let position = aggregate
            .shipments
            .iter()
            .position(|shipment| shipment.track_no.trim() == track_no)
            .map(|index| index + 1)
            .unwrap_or(1);
        validation::tracking_number_taken(position, &mut failure);
        failure.into()
    }

    fn observe<T>(mutation: Mutation, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(e) if e.is_business_error() => "rejected",
            Err(_) => "error",
        };
        metrics::record_mutation(mutation.as_str(), outcome);
    }

    // ==================== 审计 ====================

    async fn audit_one<T: Auditable + Sync>(
        &self,
        access: &SponsorshipAccess,
        event: AuditEvent,
        before: Option<&T>,
        after: Option<&T>,
    ) {
        let entry = match AuditEntry::build(
            event,
            access.conference.id,
            Some(access.whodunnit()),
            before,
            after,
        ) {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(e) => {
                error!(item_type = T::ITEM_TYPE, error = %e, "Failed to build audit entry");
                return;
            }
        };

        let item_id = entry.item_id;
        if let Err(e) = self.audit.record(entry).await {
            error!(
                item_type = T::ITEM_TYPE,
                item_id,
                error = %e,
                "Failed to record audit entry"
            );
        }
    }

    async fn audit_children<T: Auditable + Sync>(
        &self,
        access: &SponsorshipAccess,
        before: &[T],
        after: &[T],
    ) {
        for item in after {
            match before.iter().find(|prev| prev.item_id() == item.item_id()) {
                Some(prev) => {
                    self.audit_one(access, AuditEvent::Update, Some(prev), Some(item))
                        .await
                }
                None => {
                    self.audit_one(access, AuditEvent::Create, None, Some(item))
                        .await
                }
            }
        }
        for prev in before {
            if !after.iter().any(|item| item.item_id() == prev.item_id()) {
                self.audit_one(access, AuditEvent::Destroy, Some(prev), None)
                    .await;
            }
        }
    }

    async fn audit_changes(
        &self,
        access: &SponsorshipAccess,
        before: Option<&SponsorshipAggregate>,
        after: Option<&SponsorshipAggregate>,
    ) {
        let event = match (before, after) {
            (None, _) => AuditEvent::Create,
            (Some(_), None) => AuditEvent::Destroy,
            (Some(_), Some(_)) => AuditEvent::Update,
        };

        self.audit_one(
            access,
            event,
            before.map(|a| &a.sponsorship),
            after.map(|a| &a.sponsorship),
        )
        .await;
        self.audit_children(
            access,
            before.map(|a| a.swags.as_slice()).unwrap_or_default(),
            after.map(|a| a.swags.as_slice()).unwrap_or_default(),
        )
        .await;
        self.audit_children(
            access,
            before.map(|a| a.shipments.as_slice()).unwrap_or_default(),
            after.map(|a| a.shipments.as_slice()).unwrap_or_default(),
        )
        .await;
    }
}
