//! Application workflows for the caviar shop.
//!
//! - [`OrderWorkflow`] places orders against the live catalog, reserving
//!   stock and releasing it again when the order cannot be saved.
//! - [`CatalogService`] manages products and their variants.
//! - [`notification`] broadcasts staff notifications over chat.
//! - [`LoginService`] signs staff in with one-time codes sent over chat.

pub mod catalog;
pub mod error;
pub mod login;
pub mod notification;
pub mod orders;
pub mod otp;

pub use catalog::CatalogService;
pub use error::{Result, WorkflowError};
pub use login::LoginService;
pub use notification::{
    Channel, ChannelReport, ChatChannel, InMemoryChatChannel, NotificationDispatcher,
    NotificationRequest, TelegramChannel,
};
pub use orders::{OrderPage, OrderWorkflow};
pub use otp::{InMemoryOtpStore, OtpStore};
