//! 邮件投递渠道
//!
//! 当前为模拟实现，生产环境需要接入真实的邮件服务（如 SMTP、SES）。

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::SponsorEmail;
use crate::error::Result;

/// 邮件投递渠道
#[async_trait]
pub trait EmailChannel: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 投递一封邮件，返回消息 ID
    async fn send(&self, email: &SponsorEmail) -> Result<String>;
}

/// 以结构化日志模拟投递的渠道
pub struct LogEmailChannel;

impl LogEmailChannel {
    /// 纯文本邮件正文
    fn render(email: &SponsorEmail) -> String {
        format!(
            "From: {}\r\nTo: {} <{}>\r\nSubject: {}\r\n\r\n{}",
            email.from, email.recipient_name, email.to, email.subject, email.body
        )
    }
}

#[async_trait]
impl EmailChannel for LogEmailChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &SponsorEmail) -> Result<String> {
        let rendered = Self::render(email);

        debug!(
            sponsorship_id = email.sponsorship_id,
            conference = %email.conference_short_title,
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            content_length = rendered.len(),
            "Sending sponsor email"
        );

        let message_id = format!("email_{}", Uuid::new_v4());
        info!(
            sponsorship_id = email.sponsorship_id,
            message_id = %message_id,
            "Sponsor email sent"
        );

        Ok(message_id)
    }
}
