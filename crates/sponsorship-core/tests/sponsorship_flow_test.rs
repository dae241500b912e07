//! 赞助业务流程集成测试
//!
//! 使用内存仓储、内存审计和真实的邮件队列，无需外部依赖

use std::sync::Arc;

use chrono::Utc;
use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;

use sponsorship_core::dto::{
    EmailMessage, ShipmentArrival, ShipmentAttributes, SponsorshipAttributes, SwagAttributes,
};
use sponsorship_core::{
    AccessFacade, Actor, AdminFacade, Conference, LocalPictureStore, LogEmailChannel, MailQueue,
    MemoryAuditLog, MemorySponsorshipRepository, PictureStore, PictureUpload, SponsorshipAccess,
    SponsorshipError, SponsorshipService, SponsorshipState, StateCounts, StateTransition,
    SubmitterFacade,
};

// ==================== 测试环境 ====================

struct Harness {
    service: SponsorshipService,
    repo: Arc<MemorySponsorshipRepository>,
    audit: Arc<MemoryAuditLog>,
    pictures: Arc<LocalPictureStore>,
    conference: Conference,
}

fn harness_with(run_worker: bool) -> Harness {
    let repo = Arc::new(MemorySponsorshipRepository::new());
    let conference = repo.add_conference("osc24", "Open Source Conference 2024");
    repo.add_level(conference.id, "Gold");

    let audit = Arc::new(MemoryAuditLog::new());
    let (queue, worker) = MailQueue::new("sponsors@osc.test", 16, Arc::new(LogEmailChannel));
    if run_worker {
        tokio::spawn(worker.run());
    } else {
        drop(worker);
    }

    let root = std::env::temp_dir().join(format!("sponsor-flow-{}", uuid::Uuid::new_v4()));
    let pictures = Arc::new(LocalPictureStore::new(root, 64 * 1024));

    let service = SponsorshipService::new(
        repo.clone(),
        audit.clone(),
        Arc::new(queue),
        pictures.clone(),
    );

    Harness {
        service,
        repo,
        audit,
        pictures,
        conference,
    }
}

fn harness() -> Harness {
    harness_with(true)
}

fn admin() -> Actor {
    Actor {
        user_id: 1,
        username: "admin".to_string(),
        roles: vec!["admin".to_string()],
        conferences: vec![],
    }
}

fn submitter(user_id: i64) -> Actor {
    Actor {
        user_id,
        username: format!("user{user_id}"),
        roles: vec![],
        conferences: vec![],
    }
}

fn named(name: &str) -> SponsorshipAttributes {
    SponsorshipAttributes {
        name: Some(name.to_string()),
        email: Some(Some(SafeEmail().fake())),
        ..Default::default()
    }
}

fn shipment(track_no: &str) -> ShipmentAttributes {
    ShipmentAttributes {
        carrier: Some("DHL".to_string()),
        track_no: Some(track_no.to_string()),
        boxes: Some(Some(2)),
        ..Default::default()
    }
}

impl Harness {
    async fn admin_access(&self) -> SponsorshipAccess {
        self.service
            .access::<AdminFacade>(&admin(), &self.conference.short_title)
            .await
            .unwrap()
    }

    async fn submitter_access(&self, user_id: i64) -> SponsorshipAccess {
        self.service
            .access::<SubmitterFacade>(&submitter(user_id), &self.conference.short_title)
            .await
            .unwrap()
    }
}

// ==================== 增删改 ====================

#[tokio::test]
async fn test_create_with_nested_swags_and_shipments() {
    let h = harness();
    let access = h.admin_access().await;
    let name: String = CompanyName().fake();

    let mut attrs = named(&name);
    attrs.amount = Some(Some(2500.0));
    attrs.swags = vec![SwagAttributes {
        name: Some("T-Shirts".to_string()),
        quantity: Some(Some(150)),
        ..Default::default()
    }];
    attrs.shipments = vec![shipment("1Z-0001")];

    let created = h.service.create(&access, attrs).await.unwrap();

    assert_eq!(created.sponsorship.name, name);
    assert_eq!(created.sponsorship.state, SponsorshipState::ToContact);
    assert!(!created.sponsorship.paid);
    assert!(created.sponsorship.submitter_id.is_none());
    assert_eq!(created.swags.len(), 1);
    assert_eq!(created.shipments.len(), 1);

    // 每条记录各一条 create 版本
    assert_eq!(h.audit.entries_for("Sponsorship").len(), 1);
    assert_eq!(h.audit.entries_for("SponsorSwag").len(), 1);
    assert_eq!(h.audit.entries_for("SponsorShipment").len(), 1);
}

#[tokio::test]
async fn test_create_without_name_persists_nothing() {
    let h = harness();
    let access = h.admin_access().await;

    let err = h
        .service
        .create(&access, SponsorshipAttributes::default())
        .await
        .unwrap_err();

    assert!(err.validation_messages().unwrap().contains("Name can't be blank"));
    assert!(h.repo.is_empty());
    assert!(h.audit.entries().is_empty());
}

#[tokio::test]
async fn test_swag_quantity_rules() {
    let h = harness();
    let access = h.admin_access().await;

    for (quantity, accepted) in [(None, true), (Some(0), true), (Some(-1), false)] {
        let mut attrs = named("Acme");
        attrs.swags = vec![SwagAttributes {
            name: Some("Stickers".to_string()),
            quantity: Some(quantity),
            ..Default::default()
        }];

        let result = h.service.create(&access, attrs).await;
        assert_eq!(result.is_ok(), accepted, "quantity {quantity:?}");
    }
}

#[tokio::test]
async fn test_tracking_numbers_are_globally_unique() {
    let h = harness();
    let access = h.admin_access().await;

    let mut first = named("Acme");
    first.shipments = vec![shipment("TRACK-42")];
    h.service.create(&access, first).await.unwrap();

    let mut second = named("Globex");
    second.shipments = vec![shipment("TRACK-42")];
    let err = h.service.create(&access, second).await.unwrap_err();

    assert_eq!(
        err.validation_messages().as_deref(),
        Some("Shipment 1: Tracking number has already been taken")
    );
    assert_eq!(h.repo.len(), 1);

    let mut same_submission = named("Initech");
    same_submission.shipments = vec![shipment("TRACK-7"), shipment("TRACK-7")];
    assert!(matches!(
        h.service.create(&access, same_submission).await,
        Err(SponsorshipError::Invalid(_))
    ));
}

#[tokio::test]
async fn test_update_links_swags_and_tracks_arrival() {
    let h = harness();
    let access = h.admin_access().await;

    let mut attrs = named("Acme");
    attrs.swags = vec![SwagAttributes {
        name: Some("Banners".to_string()),
        quantity: Some(Some(2)),
        ..Default::default()
    }];
    let created = h.service.create(&access, attrs).await.unwrap();
    let swag_id = created.swags[0].id;

    // 尚无关联发货：送达与到场均为 true
    let statuses = h.service.swag_statuses(&access, created.id()).await.unwrap();
    assert!(statuses[0].delivered);
    assert!(statuses[0].at_venue);

    let mut link = shipment("UPS-1");
    link.swag_ids = Some(vec![swag_id]);
    link.dispatched_at = Some(Some(Utc::now()));
    let update = SponsorshipAttributes {
        shipments: vec![link],
        ..Default::default()
    };
    let updated = h.service.update(&access, created.id(), update).await.unwrap();
    let shipment_id = updated.shipments[0].id;

    let statuses = h.service.swag_statuses(&access, created.id()).await.unwrap();
    assert!(!statuses[0].delivered);
    assert!(!statuses[0].at_venue);

    let arrival = ShipmentArrival {
        delivered: Some(true),
        available: Some(true),
    };
    let shipment = h
        .service
        .record_arrival(&access, created.id(), shipment_id, arrival)
        .await
        .unwrap();
    assert!(shipment.delivered && shipment.available);

    let statuses = h.service.swag_statuses(&access, created.id()).await.unwrap();
    assert!(statuses[0].delivered);
    assert!(statuses[0].at_venue);
}

#[tokio::test]
async fn test_nested_destroy_and_foreign_swag_links() {
    let h = harness();
    let access = h.admin_access().await;

    let mut first = named("Acme");
    first.swags = vec![SwagAttributes {
        name: Some("Mugs".to_string()),
        ..Default::default()
    }];
    let first = h.service.create(&access, first).await.unwrap();

    let mut second = named("Globex");
    second.swags = vec![SwagAttributes {
        name: Some("Pens".to_string()),
        ..Default::default()
    }];
    let second = h.service.create(&access, second).await.unwrap();

    // 关联其他赞助的物料被拒绝
    let mut foreign = shipment("FX-1");
    foreign.swag_ids = Some(vec![second.swags[0].id]);
    let err = h
        .service
        .update(
            &access,
            first.id(),
            SponsorshipAttributes {
                shipments: vec![foreign],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(
        err.validation_messages()
            .unwrap()
            .contains("Swag items must belong to the same sponsorship")
    );

    let destroy = SwagAttributes {
        id: Some(first.swags[0].id),
        destroy: true,
        ..Default::default()
    };
    let updated = h
        .service
        .update(
            &access,
            first.id(),
            SponsorshipAttributes {
                swags: vec![destroy],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.swags.is_empty());
    assert_eq!(h.audit.entries_for("SponsorSwag").len(), 3);
}

#[tokio::test]
async fn test_untouched_children_produce_no_audit_entries() {
    let h = harness();
    let access = h.admin_access().await;

    let mut attrs = named("Acme");
    attrs.swags = vec![SwagAttributes {
        name: Some("Stickers".to_string()),
        ..Default::default()
    }];
    attrs.shipments = vec![shipment("AUD-1")];
    let created = h.service.create(&access, attrs).await.unwrap();

    let rename = SponsorshipAttributes {
        name: Some("Acme Corporation".to_string()),
        swags: vec![SwagAttributes {
            id: Some(created.swags[0].id),
            name: Some("Stickers".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    h.service.update(&access, created.id(), rename).await.unwrap();

    assert_eq!(h.audit.entries_for("Sponsorship").len(), 2);
    assert_eq!(h.audit.entries_for("SponsorSwag").len(), 1);
    assert_eq!(h.audit.entries_for("SponsorShipment").len(), 1);
}

#[tokio::test]
async fn test_destroy_refused_while_in_transit() {
    let h = harness();
    let access = h.admin_access().await;

    let mut attrs = named("Acme");
    let mut in_transit = shipment("TR-1");
    in_transit.dispatched_at = Some(Some(Utc::now()));
    attrs.shipments = vec![in_transit];
    let created = h.service.create(&access, attrs).await.unwrap();

    let err = h.service.destroy(&access, created.id()).await.unwrap_err();
    assert!(matches!(err, SponsorshipError::ShipmentsInTransit { count: 1, .. }));
    assert_eq!(h.repo.len(), 1);

    let arrival = ShipmentArrival {
        delivered: Some(true),
        available: None,
    };
    h.service
        .record_arrival(&access, created.id(), created.shipments[0].id, arrival)
        .await
        .unwrap();
    h.service.destroy(&access, created.id()).await.unwrap();

    assert!(h.repo.is_empty());
    // 删除级联到发货记录，释放运单号
    let mut reuse = named("Globex");
    reuse.shipments = vec![shipment("TR-1")];
    assert!(h.service.create(&access, reuse).await.is_ok());
}

// ==================== 状态机与看板 ====================

#[tokio::test]
async fn test_dashboard_counts() {
    let h = harness();
    let access = h.admin_access().await;

    let states = [
        SponsorshipState::ToContact,
        SponsorshipState::ToContact,
        SponsorshipState::Contacted,
        SponsorshipState::Unconfirmed,
        SponsorshipState::Unconfirmed,
        SponsorshipState::Unconfirmed,
        SponsorshipState::Confirmed,
        SponsorshipState::Canceled,
    ];
    for (index, state) in states.into_iter().enumerate() {
        let mut attrs = named(&format!("Sponsor {index}"));
        attrs.state = Some(state);
        h.service.create(&access, attrs).await.unwrap();
    }

    let index = h.service.index(&access).await.unwrap();
    assert_eq!(index.sponsorships.len(), 8);
    assert_eq!(
        index.counts,
        StateCounts {
            to_contact: 2,
            contacted: 1,
            in_negotiations: 3,
        }
    );
}

#[tokio::test]
async fn test_confirm_canceled_sponsorship() {
    let h = harness();
    let access = h.admin_access().await;
    let created = h.service.create(&access, named("Acme")).await.unwrap();

    h.service
        .transition(&access, created.id(), StateTransition::Cancel)
        .await
        .unwrap();
    let confirmed = h
        .service
        .transition(&access, created.id(), StateTransition::Confirm)
        .await
        .unwrap();
    assert_eq!(confirmed.state, SponsorshipState::Confirmed);

    let reloaded = h.service.show(&access, created.id()).await.unwrap();
    assert_eq!(reloaded.sponsorship.state, SponsorshipState::Confirmed);
}

// ==================== 访问门面 ====================

#[tokio::test]
async fn test_submitter_sees_and_mutates_only_own_rows() {
    let h = harness();
    let alice = h.submitter_access(10).await;
    let bob = h.submitter_access(20).await;

    let own = h.service.create(&alice, named("Alice Inc")).await.unwrap();
    assert_eq!(own.sponsorship.submitter_id, Some(10));
    h.service.create(&bob, named("Bob LLC")).await.unwrap();

    let index = h.service.index(&alice).await.unwrap();
    assert_eq!(index.sponsorships.len(), 1);
    assert_eq!(index.counts.to_contact, 1);

    assert!(matches!(
        h.service.show(&bob, own.id()).await,
        Err(SponsorshipError::Forbidden(_))
    ));
    assert!(matches!(
        h.service
            .update(&bob, own.id(), named("Hijacked"))
            .await,
        Err(SponsorshipError::Forbidden(_))
    ));
    assert!(matches!(
        h.service
            .transition(&bob, own.id(), StateTransition::Cancel)
            .await,
        Err(SponsorshipError::Forbidden(_))
    ));

    let reloaded = h.service.show(&alice, own.id()).await.unwrap();
    assert_eq!(reloaded.sponsorship.name, "Alice Inc");
    assert_eq!(reloaded.sponsorship.state, SponsorshipState::ToContact);
}

#[tokio::test]
async fn test_admin_facade_rejects_outsiders() {
    let h = harness();
    let result = h
        .service
        .access::<AdminFacade>(&submitter(5), &h.conference.short_title)
        .await;
    assert!(matches!(result, Err(SponsorshipError::Forbidden(_))));

    let organizer = Actor {
        roles: vec!["organizer".to_string()],
        conferences: vec!["osc24".to_string()],
        ..submitter(6)
    };
    let access = AdminFacade::access(&organizer, h.conference.clone()).unwrap();
    assert_eq!(access.noun, "Sponsor");
}

#[tokio::test]
async fn test_admin_requires_sponsorship_level() {
    let h = harness();
    let other = h.repo.add_conference("empty24", "Empty Conference");

    let access = h
        .service
        .access::<AdminFacade>(&admin(), &other.short_title)
        .await
        .unwrap();
    assert!(matches!(
        h.service.new_form(&access).await,
        Err(SponsorshipError::SponsorshipLevelRequired)
    ));

    let form = h.service.new_form(&h.admin_access().await).await.unwrap();
    assert_eq!(form.levels.len(), 1);
    assert_eq!(form.sponsorship.state, SponsorshipState::ToContact);
}

// ==================== 邮件 ====================

#[tokio::test]
async fn test_email_is_enqueued() {
    let h = harness();
    let access = h.admin_access().await;
    let mut attrs = named("Acme");
    attrs.email = Some(Some("hello@acme.test".to_string()));
    let created = h.service.create(&access, attrs).await.unwrap();

    let draft = h.service.prepare_email(&access, created.id()).await.unwrap();
    assert_eq!(draft.from, "sponsors@osc.test");
    assert_eq!(draft.to.as_deref(), Some("hello@acme.test"));

    let notice = h
        .service
        .send_email(
            &access,
            created.id(),
            EmailMessage {
                from: None,
                subject: "Booth details".to_string(),
                body: "Your booth is B12".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(notice, "Email sent to Acme(hello@acme.test)");
}

#[tokio::test]
async fn test_email_failure_leaves_sponsorship_unchanged() {
    let h = harness_with(false);
    let access = h.admin_access().await;
    let created = h.service.create(&access, named("Acme")).await.unwrap();

    let err = h
        .service
        .send_email(
            &access,
            created.id(),
            EmailMessage {
                from: None,
                subject: "Invoice".to_string(),
                body: "Attached".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Email failed: the email queue is closed");

    let reloaded = h.service.show(&access, created.id()).await.unwrap();
    assert_eq!(reloaded, created);
}

// ==================== 图片 ====================

#[tokio::test]
async fn test_picture_upload_flow() {
    let h = harness();
    let access = h.admin_access().await;

    let token = h
        .service
        .stash_picture(
            &access,
            PictureUpload {
                file_name: "logo.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![1, 2, 3, 4],
            },
        )
        .await
        .unwrap();

    let mut attrs = named("Acme");
    attrs.picture_cache = Some(token.clone());
    let created = h.service.create(&access, attrs).await.unwrap();
    let reference = created.sponsorship.picture.clone().unwrap();
    assert_eq!(reference, format!("pictures/{token}"));

    let mut unknown = named("Globex");
    unknown.picture_cache = Some(token);
    let err = h.service.create(&access, unknown).await.unwrap_err();
    assert_eq!(
        err.validation_messages().as_deref(),
        Some("Picture upload has expired or is unknown")
    );

    h.pictures.remove(&reference).await.unwrap();
}
