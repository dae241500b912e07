//! 赞助管理核心库
//!
//! 会议赞助商的全生命周期管理：从初次联系、洽谈、确认到取消，
//! 以及赞助物料（swag）和发货记录的子账本。
//!
//! ## 核心功能
//!
//! - **状态机**：`Lifecycle` trait 驱动赞助状态流转
//! - **物料与发货**：物料承诺、发货单号唯一性、送达/到场聚合判断
//! - **增删改查**：带嵌套物料/发货的整体校验与事务落库
//! - **邮件通知**：异步入队，后台 worker 投递
//! - **访问门面**：管理端与提交者两种权限视角共用同一实体
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `lifecycle`: 状态机与看板计数
//! - `validation`: 保存前的业务校验
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层（Postgres 与内存两种实现）
//! - `audit`: 变更审计
//! - `notification`: 邮件队列与投递渠道
//! - `storage`: Logo 图片存储
//! - `access`: 访问门面与权限范围
//! - `service`: 业务服务层

pub mod access;
pub mod audit;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notification;
pub mod repository;
pub mod service;
pub mod storage;
pub mod validation;

pub use access::{AccessFacade, AccessScope, Actor, AdminFacade, SponsorshipAccess, SubmitterFacade};
pub use audit::{AuditEntry, AuditEvent, AuditLog, MemoryAuditLog, PgAuditLog};
pub use error::{Result, SponsorshipError};
pub use lifecycle::{Lifecycle, StateCounts};
pub use models::*;
pub use notification::{
    EmailChannel, EmailQueue, EmailWorker, LogEmailChannel, MailQueue, SponsorEmail,
};
pub use repository::{
    MemorySponsorshipRepository, RemovedChildren, SponsorshipRepository,
    SponsorshipRepositoryTrait,
};
pub use service::{SponsorshipService, dto};
pub use storage::{LocalPictureStore, PictureStore, PictureUpload};
pub use validation::{FieldError, ValidationFailure};
