use crate::dispatcher::{DispatchConfig, NotifyDispatcher};
use crate::providers::{
    EmailConfig, EmailNotifier, SmsConfig, SmsNotifier, TelegramConfig, TelegramNotifier,
};
use crate::{NotifyChannel, NotifyError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// 通知渠道配置
///
/// 缺省的渠道不注册，对应通知器在投递时按渠道未配置记失败
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// 邮件渠道
    pub email: Option<EmailConfig>,

    /// Telegram 渠道
    pub telegram: Option<TelegramConfig>,

    /// 短信渠道
    pub sms: Option<SmsConfig>,

    /// 投递参数
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl ChannelsConfig {
    /// 从 TOML 文本解析配置
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| NotifyError::validation(format!("Invalid channels config: {}", e)))
    }
}

impl NotifyDispatcher {
    /// 按配置注册已启用的渠道
    pub async fn register_channels(&self, config: &ChannelsConfig) {
        if let Some(email) = &config.email {
            self.register(
                NotifyChannel::Email,
                Arc::new(EmailNotifier::new(email.clone())),
            )
            .await;
        }
        if let Some(telegram) = &config.telegram {
            self.register(
                NotifyChannel::Telegram,
                Arc::new(TelegramNotifier::new(telegram.clone())),
            )
            .await;
        }
        if let Some(sms) = &config.sms {
            self.register(NotifyChannel::Sms, Arc::new(SmsNotifier::new(sms.clone())))
                .await;
        }
        info!("Notification channels registered from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels_config() {
        let config = ChannelsConfig::from_toml(
            r#"
            [email]
            smtp_host = "smtp.example.com"
            smtp_port = 587
            username = "alerts"
            password = "secret"
            from = "alerts@example.com"

            [telegram]
            bot_token = "123:abc"

            [dispatch]
            max_retries = 5
            retry_backoff_secs = 2
            send_timeout_secs = 8
            "#,
        )
        .unwrap();

        assert!(config.email.is_some());
        assert!(config.telegram.is_some());
        assert!(config.sms.is_none());
        assert_eq!(config.dispatch.max_retries, 5);

        // 未填写的 telegram api 地址取默认
        assert_eq!(
            config.telegram.unwrap().api_base,
            "https://api.telegram.org"
        );
    }

    #[test]
    fn test_parse_empty_config() {
        let config = ChannelsConfig::from_toml("").unwrap();
        assert!(config.email.is_none());
        assert_eq!(config.dispatch.max_retries, 3);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = ChannelsConfig::from_toml("email = 42");
        assert!(matches!(
            result.unwrap_err(),
            NotifyError::ValidationError(_)
        ));
    }
}
