use crate::{
    Notification, NotificationPreferences, NotificationStatus, NotifyChannel, Operator,
};
use sea_orm::ActiveValue::Set;
use serde_json::Value as JsonValue;

fn preferences_to_json(preferences: &NotificationPreferences) -> Option<JsonValue> {
    serde_json::to_value(preferences).ok()
}

fn json_to_preferences(json: Option<&JsonValue>) -> NotificationPreferences {
    json.and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Operator 模型与数据库实体的转换
impl From<Operator> for super::operator::ActiveModel {
    fn from(operator: Operator) -> Self {
        Self {
            id: Set(operator.id),
            name: Set(operator.name),
            email: Set(operator.email),
            telegram_chat_id: Set(operator.telegram_chat_id),
            phone: Set(operator.phone),
            priority: Set(operator.priority),
            is_active: Set(operator.is_active),
            preferences: Set(preferences_to_json(&operator.preferences)),
            created_at: Set(operator.created_at),
            updated_at: Set(operator.updated_at),
        }
    }
}

impl From<super::operator::Model> for Operator {
    fn from(model: super::operator::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            telegram_chat_id: model.telegram_chat_id,
            phone: model.phone,
            priority: model.priority,
            is_active: model.is_active,
            preferences: json_to_preferences(model.preferences.as_ref()),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Notification 模型与数据库实体的转换
impl From<Notification> for super::notification::ActiveModel {
    fn from(notification: Notification) -> Self {
        Self {
            id: Set(notification.id),
            incident_id: Set(notification.incident_id),
            alert_id: Set(notification.alert_id),
            operator_id: Set(notification.operator_id),
            channel: Set(notification.channel.as_str().to_string()),
            address: Set(notification.address),
            status: Set(notification.status.as_str().to_string()),
            retry_count: Set(notification.retry_count),
            error: Set(notification.error),
            sent_at: Set(notification.sent_at),
            delivered_at: Set(notification.delivered_at),
            read_at: Set(notification.read_at),
            created_at: Set(notification.created_at),
        }
    }
}

impl From<super::notification::Model> for Notification {
    fn from(model: super::notification::Model) -> Self {
        Self {
            id: model.id,
            incident_id: model.incident_id,
            alert_id: model.alert_id,
            operator_id: model.operator_id,
            channel: NotifyChannel::from_str(&model.channel),
            address: model.address,
            status: NotificationStatus::from_str(&model.status),
            retry_count: model.retry_count,
            error: model.error,
            sent_at: model.sent_at,
            delivered_at: model.delivered_at,
            read_at: model.read_at,
            created_at: model.created_at,
        }
    }
}
