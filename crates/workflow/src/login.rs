//! Staff login with one-time codes delivered over chat.

use std::sync::Arc;

use domain::User;
use store::UserStore;

use crate::error::{Result, WorkflowError};
use crate::notification::ChatChannel;
use crate::otp::OtpStore;

fn code_message(code: &str) -> String {
    format!("🔐 Your login code: <code>{code}</code>\n⏰ Expires in 1 hour")
}

/// Sends login codes to linked chats and checks them.
#[derive(Clone)]
pub struct LoginService {
    users: Arc<dyn UserStore>,
    codes: Arc<dyn OtpStore>,
    chat: Option<Arc<dyn ChatChannel>>,
}

impl LoginService {
    pub fn new(
        users: Arc<dyn UserStore>,
        codes: Arc<dyn OtpStore>,
        chat: Option<Arc<dyn ChatChannel>>,
    ) -> Self {
        Self { users, codes, chat }
    }

    async fn user_for_chat(&self, chat_id: i64) -> Result<User> {
        self.users
            .users_with_chat_id()
            .await?
            .into_iter()
            .find(|user| user.chat_id() == Some(chat_id))
            .ok_or(WorkflowError::UnknownChat { chat_id })
    }

    /// Issues a code for the user linked to `chat_id` and sends it there.
    #[tracing::instrument(skip(self))]
    pub async fn request_code(&self, chat_id: i64) -> Result<()> {
        let chat = self.chat.as_ref().ok_or(WorkflowError::ChatUnavailable)?;
        let user = self.user_for_chat(chat_id).await?;

        let code = self.codes.issue(&chat_id.to_string()).await;
        chat.send_message(chat_id, &code_message(&code)).await?;

        tracing::info!(user_id = %user.id, "login code sent");
        Ok(())
    }

    /// Consumes the code for `chat_id` and returns the matching user.
    #[tracing::instrument(skip(self, code))]
    pub async fn verify_code(&self, chat_id: i64, code: &str) -> Result<User> {
        if !self.codes.verify(&chat_id.to_string(), code).await {
            return Err(WorkflowError::InvalidCode);
        }
        self.user_for_chat(chat_id).await
    }
}
