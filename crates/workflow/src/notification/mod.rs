//! Staff notifications.
//!
//! The dispatcher broadcasts a message on every requested channel that is
//! also enabled. Only the chat channel has a transport; chat recipients are
//! contacted in batches with a pause between batches to stay under the
//! provider's rate limit. A failed recipient is counted and logged and never
//! stops the batch.

mod chat;
mod message;
mod telegram;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::UserId;
use domain::Order;
use serde::{Deserialize, Serialize};
use store::UserStore;

use crate::error::{Result, WorkflowError};

pub use chat::{ChatChannel, InMemoryChatChannel, SentMessage};
pub use message::{ORDER_CREATED_TITLE, escape_html, format_order_created};
pub use telegram::TelegramChannel;

/// Recipients contacted before pausing.
pub const BATCH_SIZE: usize = 30;

/// Pause between two batches.
pub const BATCH_DELAY: Duration = Duration::from_millis(100);

/// Delivery channels known to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Chat,
    Email,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Chat => "chat",
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }

    /// Human-facing channel name.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Chat => "chat",
            Channel::Email => "email",
            Channel::Sms => "SMS",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message to broadcast.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
    pub channels: Vec<Channel>,
    /// Explicit audience. Empty means every user with a linked chat.
    pub user_ids: Vec<UserId>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            channels: vec![Channel::Chat],
            user_ids: Vec::new(),
        }
    }

    pub fn channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = channels;
        self
    }

    pub fn to_users(mut self, user_ids: Vec<UserId>) -> Self {
        self.user_ids = user_ids;
        self
    }
}

/// Outcome of broadcasting on one channel.
#[derive(Debug)]
pub struct ChannelReport {
    pub channel: Channel,
    pub sent: usize,
    pub failed: usize,
    /// One entry per failed recipient.
    pub recipient_errors: Vec<String>,
    /// Set when the channel could not be used at all.
    pub error: Option<WorkflowError>,
    pub processed_at: DateTime<Utc>,
}

impl ChannelReport {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            sent: 0,
            failed: 0,
            recipient_errors: Vec::new(),
            error: None,
            processed_at: Utc::now(),
        }
    }

    fn failed_with(channel: Channel, error: WorkflowError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(channel)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.failed == 0
    }
}

/// Fans notifications out to staff.
pub struct NotificationDispatcher {
    users: Arc<dyn UserStore>,
    chat: Arc<dyn ChatChannel>,
    enabled: Vec<Channel>,
    batch_size: usize,
    batch_delay: Duration,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with only the chat channel enabled.
    pub fn new(users: Arc<dyn UserStore>, chat: Arc<dyn ChatChannel>) -> Self {
        Self {
            users,
            chat,
            enabled: vec![Channel::Chat],
            batch_size: BATCH_SIZE,
            batch_delay: BATCH_DELAY,
        }
    }

    pub fn with_enabled_channels(mut self, channels: Vec<Channel>) -> Self {
        tracing::info!(?channels, "enabled notification channels");
        self.enabled = channels;
        self
    }

    /// Overrides the batching parameters. A zero size is treated as 1.
    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_delay = batch_delay;
        self
    }

    /// Announces a new order on the chat channel.
    pub async fn send_order_created(&self, order: &Order) -> Vec<ChannelReport> {
        let request = NotificationRequest::new(ORDER_CREATED_TITLE, format_order_created(order));
        self.send(&request).await
    }

    /// Broadcasts on each requested channel that is enabled, in request order.
    #[tracing::instrument(skip(self, request), fields(title = %request.title))]
    pub async fn send(&self, request: &NotificationRequest) -> Vec<ChannelReport> {
        let mut reports = Vec::new();
        for &channel in &request.channels {
            if !self.enabled.contains(&channel) {
                tracing::debug!(%channel, "channel not enabled, skipping");
                continue;
            }

            let report = match channel {
                Channel::Chat => self.send_chat(request).await,
                Channel::Email | Channel::Sms => {
                    ChannelReport::failed_with(channel, WorkflowError::ChannelNotImplemented(channel))
                }
            };
            if let Some(ref err) = report.error {
                tracing::error!(%channel, error = %err, "failed to send notification");
            }
            reports.push(report);
        }

        for report in &reports {
            tracing::info!(
                channel = %report.channel,
                sent = report.sent,
                failed = report.failed,
                "notification processed"
            );
        }
        reports
    }

    async fn send_chat(&self, request: &NotificationRequest) -> ChannelReport {
        let mut report = ChannelReport::new(Channel::Chat);

        let users = match self.audience(&request.user_ids).await {
            Ok(users) => users,
            Err(err) => return ChannelReport::failed_with(Channel::Chat, err),
        };
        let recipients: Vec<(UserId, i64)> = users
            .iter()
            .filter_map(|user| user.chat_id().map(|chat_id| (user.id, chat_id)))
            .collect();
        if recipients.is_empty() {
            tracing::info!("no users with a linked chat to notify");
            return report;
        }

        tracing::info!(recipients = recipients.len(), "sending chat notification");
        let batches = recipients.chunks(self.batch_size).count();
        for (index, batch) in recipients.chunks(self.batch_size).enumerate() {
            for &(user_id, chat_id) in batch {
                match self.chat.send_message(chat_id, &request.message).await {
                    Ok(()) => {
                        report.sent += 1;
                        metrics::counter!("notifications_sent_total").increment(1);
                        tracing::debug!(%user_id, chat_id, "chat message sent");
                    }
                    Err(err) => {
                        report.failed += 1;
                        metrics::counter!("notifications_failed_total").increment(1);
                        tracing::warn!(%user_id, chat_id, error = %err, "failed to send chat message");
                        report.recipient_errors.push(format!("user {user_id}: {err}"));
                    }
                }
            }
            if index + 1 < batches {
                tokio::time::sleep(self.batch_delay).await;
            }
        }
        report
    }

    async fn audience(&self, user_ids: &[UserId]) -> Result<Vec<domain::User>> {
        if user_ids.is_empty() {
            return Ok(self.users.users_with_chat_id().await?);
        }

        let mut users = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            match self.users.get_user(user_id).await {
                Ok(user) => users.push(user),
                Err(err) => tracing::warn!(%user_id, error = %err, "failed to load user"),
            }
        }
        Ok(users)
    }
}
