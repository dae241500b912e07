//! 服务层
//!
//! 实现赞助业务逻辑，协调仓储、审计、图片存储和邮件队列。
//!
//! ## 模块结构
//!
//! - `dto`: 服务层输入输出对象
//! - `sponsorship_service`: 赞助增删改查、状态流转、邮件与到货跟踪

pub mod dto;
mod sponsorship_service;

pub use dto::*;
pub use sponsorship_service::SponsorshipService;
