//! 变更审计
//!
//! 每次增删改按记录生成一条版本，保存字段级的前后值。
//! 物料和发货记录仅 `updatedAt` 变化时不生成版本。
//! 审计写入失败只记日志，不影响业务操作。

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{SponsorShipment, SponsorSwag, Sponsorship};

/// 审计事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum AuditEvent {
    Create,
    Update,
    Destroy,
}

/// 可审计的记录
pub trait Auditable: Serialize {
    const ITEM_TYPE: &'static str;

    fn item_id(&self) -> i64;

    /// 单独变化时不生成版本的字段
    fn ignored_fields() -> &'static [&'static str] {
        &[]
    }
}

impl Auditable for Sponsorship {
    const ITEM_TYPE: &'static str = "Sponsorship";

    fn item_id(&self) -> i64 {
        self.id
    }
}

impl Auditable for SponsorSwag {
    const ITEM_TYPE: &'static str = "SponsorSwag";

    fn item_id(&self) -> i64 {
        self.id
    }

    fn ignored_fields() -> &'static [&'static str] {
        &["updatedAt"]
    }
}

impl Auditable for SponsorShipment {
    const ITEM_TYPE: &'static str = "SponsorShipment";

    fn item_id(&self) -> i64 {
        self.id
    }

    fn ignored_fields() -> &'static [&'static str] {
        &["updatedAt"]
    }
}

/// 审计版本
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub item_type: &'static str,
    pub item_id: i64,
    pub event: AuditEvent,
    pub conference_id: i64,
    /// 操作人 ID
    pub whodunnit: Option<String>,
    /// 字段 -> [变更前, 变更后]
    pub object_changes: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// 根据变更前后快照生成版本
    ///
    /// 更新事件在没有有效字段变化时返回 None
    pub fn build<T: Auditable>(
        event: AuditEvent,
        conference_id: i64,
        whodunnit: Option<String>,
        before: Option<&T>,
        after: Option<&T>,
    ) -> Result<Option<Self>> {
        let item_id = match after.or(before) {
            Some(item) => item.item_id(),
            None => return Ok(None),
        };
        let before = before.map(serde_json::to_value).transpose()?;
        let after = after.map(serde_json::to_value).transpose()?;
        let changes = diff(before.as_ref(), after.as_ref());

        if event == AuditEvent::Update {
            let ignored: HashSet<&str> = T::ignored_fields().iter().copied().collect();
            if changes.keys().all(|key| ignored.contains(key.as_str())) {
                return Ok(None);
            }
        }

        Ok(Some(Self {
            item_type: T::ITEM_TYPE,
            item_id,
            event,
            conference_id,
            whodunnit,
            object_changes: Value::Object(changes),
            created_at: Utc::now(),
        }))
    }
}

/// 字段级差异，只保留前后不同的字段
fn diff(before: Option<&Value>, after: Option<&Value>) -> Map<String, Value> {
    let empty = Map::new();
    let before = before.and_then(Value::as_object).unwrap_or(&empty);
    let after = after.and_then(Value::as_object).unwrap_or(&empty);

    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key).cloned().unwrap_or(Value::Null);
            let new = after.get(key).cloned().unwrap_or(Value::Null);
            (old != new).then(|| (key.clone(), Value::Array(vec![old, new])))
        })
        .collect()
}

/// 审计日志接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// 写入 versions 表的审计日志
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO versions
                (item_type, item_id, event, conference_id, whodunnit, object_changes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.item_type)
        .bind(entry.item_id)
        .bind(entry.event)
        .bind(entry.conference_id)
        .bind(&entry.whodunnit)
        .bind(&entry.object_changes)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// 内存审计日志，用于本地开发和测试
#[derive(Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// 某类记录的全部版本
    pub fn entries_for(&self, item_type: &str) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.item_type == item_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}
