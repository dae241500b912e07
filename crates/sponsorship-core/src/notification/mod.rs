//! 赞助邮件通知
//!
//! 业务侧只负责把邮件放入队列，后台 worker 取出后交给投递渠道。
//! 入队成功即视为操作成功，投递结果只记录日志和指标。
//!
//! - `queue`: 邮件队列（`EmailQueue` trait、`MailQueue` 实现与 `EmailWorker`）
//! - `channel`: 投递渠道（`EmailChannel` trait 与模拟实现 `LogEmailChannel`）

mod channel;
mod queue;

pub use channel::{EmailChannel, LogEmailChannel};
pub use queue::{EmailQueue, EmailWorker, MailQueue};

#[cfg(test)]
pub use queue::MockEmailQueue;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 待发送的赞助邮件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorEmail {
    pub sponsorship_id: i64,
    pub conference_short_title: String,
    /// 收件人名称（赞助商名称）
    pub recipient_name: String,
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub enqueued_at: DateTime<Utc>,
}
