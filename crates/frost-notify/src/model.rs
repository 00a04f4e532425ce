use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 值班员
///
/// 升级层级决定哪一级告警会触达该值班员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    /// 值班员 ID
    pub id: String,

    /// 姓名
    pub name: String,

    /// 邮箱
    pub email: Option<String>,

    /// Telegram 会话 ID
    pub telegram_chat_id: Option<String>,

    /// 手机号（短信渠道）
    pub phone: Option<String>,

    /// 优先级层级（1=主值班，2=副值班，3=第三梯队）
    pub priority: i32,

    /// 是否在岗
    pub is_active: bool,

    /// 渠道偏好
    pub preferences: NotificationPreferences,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Operator {
    /// 创建新值班员
    pub fn new(name: String, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: format!("op_{}", uuid::Uuid::new_v4().simple()),
            name,
            email: None,
            telegram_chat_id: None,
            phone: None,
            priority,
            is_active: true,
            preferences: NotificationPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 解析可用的通知渠道
    ///
    /// 渠道可用 = 联系方式存在且偏好开启
    pub fn channels(&self) -> Vec<(NotifyChannel, String)> {
        let mut channels = Vec::new();
        if self.preferences.email_enabled {
            if let Some(email) = &self.email {
                channels.push((NotifyChannel::Email, email.clone()));
            }
        }
        if self.preferences.telegram_enabled {
            if let Some(chat_id) = &self.telegram_chat_id {
                channels.push((NotifyChannel::Telegram, chat_id.clone()));
            }
        }
        if self.preferences.sms_enabled {
            if let Some(phone) = &self.phone {
                channels.push((NotifyChannel::Sms, phone.clone()));
            }
        }
        channels
    }
}

/// 渠道偏好
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email_enabled: bool,
    pub telegram_enabled: bool,
    pub sms_enabled: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_enabled: true,
            telegram_enabled: true,
            sms_enabled: false,
        }
    }
}

/// 通知渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifyChannel {
    /// 邮件
    Email,
    /// Telegram
    Telegram,
    /// 短信
    Sms,
}

impl NotifyChannel {
    pub fn as_str(&self) -> &str {
        match self {
            NotifyChannel::Email => "email",
            NotifyChannel::Telegram => "telegram",
            NotifyChannel::Sms => "sms",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "telegram" => NotifyChannel::Telegram,
            "sms" => NotifyChannel::Sms,
            _ => NotifyChannel::Email,
        }
    }
}

/// 通知状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    /// 待投递
    Pending,
    /// 已发送
    Sent,
    /// 投递失败（重试耗尽）
    Failed,
    /// 已送达
    Delivered,
    /// 已读
    Read,
    /// 已取消
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Read => "read",
            NotificationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "sent" => NotificationStatus::Sent,
            "failed" => NotificationStatus::Failed,
            "delivered" => NotificationStatus::Delivered,
            "read" => NotificationStatus::Read,
            "cancelled" => NotificationStatus::Cancelled,
            _ => NotificationStatus::Pending,
        }
    }
}

/// 一次投递记录
///
/// 一条记录对应一个（值班员, 渠道）投递尝试
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// 通知 ID
    pub id: String,

    /// 关联事件 ID
    pub incident_id: Option<String>,

    /// 关联告警 ID
    pub alert_id: Option<String>,

    /// 值班员 ID
    pub operator_id: String,

    /// 投递渠道
    pub channel: NotifyChannel,

    /// 投递地址
    pub address: String,

    /// 状态
    pub status: NotificationStatus,

    /// 已重试次数
    pub retry_count: i32,

    /// 失败原因
    pub error: Option<String>,

    /// 发送时间
    pub sent_at: Option<DateTime<Utc>>,

    /// 送达时间
    pub delivered_at: Option<DateTime<Utc>>,

    /// 已读时间
    pub read_at: Option<DateTime<Utc>>,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// 创建待投递的通知记录
    pub fn new(operator_id: String, channel: NotifyChannel, address: String) -> Self {
        Self {
            id: format!("ntf_{}", uuid::Uuid::new_v4().simple()),
            incident_id: None,
            alert_id: None,
            operator_id,
            channel,
            address,
            status: NotificationStatus::Pending,
            retry_count: 0,
            error: None,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_incident(mut self, incident_id: String) -> Self {
        self.incident_id = Some(incident_id);
        self
    }

    pub fn for_alert(mut self, alert_id: String) -> Self {
        self.alert_id = Some(alert_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_channels() {
        let mut operator = Operator::new("张伟".to_string(), 1);
        operator.email = Some("zhangwei@example.com".to_string());
        operator.telegram_chat_id = Some("123456".to_string());
        operator.phone = Some("+8613800000000".to_string());

        // 默认偏好：邮件和 Telegram 开启，短信关闭
        let channels = operator.channels();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].0, NotifyChannel::Email);
        assert_eq!(channels[1].0, NotifyChannel::Telegram);
    }

    #[test]
    fn test_operator_channels_require_contact() {
        let operator = Operator::new("张伟".to_string(), 1);
        // 偏好开启但没有联系方式
        assert!(operator.channels().is_empty());
    }

    #[test]
    fn test_channel_preference_disabled() {
        let mut operator = Operator::new("张伟".to_string(), 2);
        operator.email = Some("zhangwei@example.com".to_string());
        operator.preferences.email_enabled = false;

        assert!(operator.channels().is_empty());
    }

    #[test]
    fn test_notification_new_is_pending() {
        let n = Notification::new(
            "op_1".to_string(),
            NotifyChannel::Email,
            "a@example.com".to_string(),
        );
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(n.retry_count, 0);
        assert!(n.id.starts_with("ntf_"));
    }
}
