pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod model;
pub mod notifier;
pub mod operators;
pub mod providers;
pub mod records;

pub use config::ChannelsConfig;
pub use db::{notification, operator};
pub use dispatcher::{DispatchConfig, DispatchRequest, NotifyDispatcher};
pub use error::{NotifyError, Result};
pub use message::{NotifyLevel, NotifyMessage};
pub use model::{
    Notification, NotificationPreferences, NotificationStatus, NotifyChannel, Operator,
};
pub use notifier::{Notifier, NotifyResult};
pub use operators::OperatorDirectory;
pub use providers::{
    EmailConfig, EmailNotifier, SmsConfig, SmsNotifier, TelegramConfig, TelegramNotifier,
};
pub use records::NotificationStore;
