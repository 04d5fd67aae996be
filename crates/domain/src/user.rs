use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

/// A back-office user. Users with a linked chat account receive order alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns the chat id if one is linked and usable.
    pub fn chat_id(&self) -> Option<i64> {
        self.telegram_id.filter(|id| *id > 0)
    }
}
