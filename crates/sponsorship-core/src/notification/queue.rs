//! 邮件队列
//!
//! 基于有界 mpsc 通道，容量耗尽或 worker 退出时入队失败，由调用方提示用户。

use std::sync::Arc;

use async_trait::async_trait;
use sponsor_shared::observability::metrics;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::SponsorEmail;
use super::channel::EmailChannel;
use crate::error::{Result, SponsorshipError};

/// 邮件队列接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailQueue: Send + Sync {
    /// 默认发件人地址
    fn default_sender(&self) -> String;

    /// 放入发送队列，不等待投递结果
    async fn enqueue(&self, email: SponsorEmail) -> Result<()>;
}

/// 基于 tokio mpsc 的邮件队列
#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::Sender<SponsorEmail>,
    default_from: String,
}

impl MailQueue {
    /// 创建队列及对应的 worker，worker 需要由调用方 spawn
    pub fn new(
        default_from: impl Into<String>,
        capacity: usize,
        channel: Arc<dyn EmailChannel>,
    ) -> (Self, EmailWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender,
            default_from: default_from.into(),
        };
        (queue, EmailWorker { receiver, channel })
    }
}

#[async_trait]
impl EmailQueue for MailQueue {
    fn default_sender(&self) -> String {
        self.default_from.clone()
    }

    async fn enqueue(&self, email: SponsorEmail) -> Result<()> {
        let sponsorship_id = email.sponsorship_id;
        self.sender.try_send(email).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!(sponsorship_id, "Email queue is full");
                SponsorshipError::EmailFailed("the email queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                error!(sponsorship_id, "Email queue is closed");
                SponsorshipError::EmailFailed("the email queue is closed".to_string())
            }
        })?;

        metrics::record_email_enqueued();
        Ok(())
    }
}

/// 后台邮件投递任务
pub struct EmailWorker {
    receiver: mpsc::Receiver<SponsorEmail>,
    channel: Arc<dyn EmailChannel>,
}

impl EmailWorker {
    /// 持续消费队列，所有发送端释放后退出
    pub async fn run(mut self) {
        info!(channel = self.channel.name(), "Email worker started");

        while let Some(email) = self.receiver.recv().await {
            match self.channel.send(&email).await {
                Ok(message_id) => {
                    metrics::record_email_sent("success");
                    info!(
                        sponsorship_id = email.sponsorship_id,
                        message_id = %message_id,
                        "Sponsor email delivered"
                    );
                }
                Err(e) => {
                    metrics::record_email_sent("failure");
                    error!(
                        sponsorship_id = email.sponsorship_id,
                        error = %e,
                        "Sponsor email delivery failed"
                    );
                }
            }
        }

        info!("Email worker stopped");
    }
}
