use crate::message::NotifyMessage;
use crate::notifier::{Notifier, NotifyResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// 邮件通知
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

pub struct EmailNotifier {
    config: EmailConfig,
    enabled: bool,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            enabled: true,
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, address: &str, message: &NotifyMessage) -> Result<NotifyResult> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{Message, SmtpTransport, Transport};

        let email = Message::builder()
            .from(self.config.from.parse()?)
            .to(address.parse()?)
            .subject(&message.title)
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "{}\n\nLevel: {:?}\nTime: {}",
                message.content, message.level, message.timestamp
            ))?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let mailer = SmtpTransport::relay(&self.config.smtp_host)?
            .credentials(creds)
            .port(self.config.smtp_port)
            .build();

        match mailer.send(&email) {
            Ok(_) => Ok(NotifyResult::success()),
            Err(e) => Ok(NotifyResult::failure(format!("Email send failed: {}", e))),
        }
    }

    fn name(&self) -> &str {
        "email"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ============================================================================
// Telegram 通知
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Bot API 地址，测试时可指向本地
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            enabled: true,
        }
    }

    fn build_message(&self, message: &NotifyMessage) -> String {
        format!(
            "*{}*\n\n{}\n\nLevel: {:?}\nTime: {}",
            message.title, message.content, message.level, message.timestamp
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, address: &str, message: &NotifyMessage) -> Result<NotifyResult> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        );
        let body = serde_json::json!({
            "chat_id": address,
            "text": self.build_message(message),
            "parse_mode": "Markdown",
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if response.status().is_success() {
            Ok(NotifyResult::success())
        } else {
            Ok(NotifyResult::failure(format!(
                "Telegram failed with status: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        "telegram"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ============================================================================
// 短信通知（HTTP 网关）
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

pub struct SmsNotifier {
    config: SmsConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl SmsNotifier {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            enabled: true,
        }
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn send(&self, address: &str, message: &NotifyMessage) -> Result<NotifyResult> {
        // 短信只发标题行，正文留给邮件渠道
        let body = serde_json::json!({
            "to": address,
            "from": self.config.from,
            "text": format!("{}: {}", message.title, message.content),
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(NotifyResult::success())
        } else {
            Ok(NotifyResult::failure(format!(
                "SMS gateway failed with status: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        "sms"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
