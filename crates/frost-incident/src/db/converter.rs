use crate::{
    Alert, AlertSeverity, AlertType, Incident, IncidentComment, IncidentStatus, TimelineEvent,
    TimelineEventType,
};
use sea_orm::ActiveValue::{NotSet, Set};
use serde_json::Value as JsonValue;

/// Alert 模型与数据库实体的转换
impl From<Alert> for super::alert::ActiveModel {
    fn from(alert: Alert) -> Self {
        Self {
            id: Set(alert.id),
            device_id: Set(alert.device_id),
            reading_id: Set(alert.reading_id),
            alert_type: Set(alert.alert_type.as_str().to_string()),
            severity: Set(alert.severity.as_str().to_string()),
            message: Set(alert.message),
            resolved: Set(alert.resolved),
            resolved_at: Set(alert.resolved_at),
            resolved_by: Set(alert.resolved_by),
            created_at: Set(alert.created_at),
        }
    }
}

impl From<super::alert::Model> for Alert {
    fn from(model: super::alert::Model) -> Self {
        Self {
            id: model.id,
            device_id: model.device_id,
            reading_id: model.reading_id,
            alert_type: AlertType::from_str(&model.alert_type),
            severity: AlertSeverity::from_str(&model.severity),
            message: model.message,
            resolved: model.resolved,
            resolved_at: model.resolved_at,
            resolved_by: model.resolved_by,
            created_at: model.created_at,
        }
    }
}

/// Incident 模型与数据库实体的转换
impl From<Incident> for super::incident::ActiveModel {
    fn from(incident: Incident) -> Self {
        Self {
            id: Set(incident.id),
            device_id: Set(incident.device_id),
            alert_id: Set(incident.alert_id),
            description: Set(incident.description),
            status: Set(incident.status.as_str().to_string()),
            alert_count: Set(incident.alert_count),
            current_escalation_level: Set(incident.current_escalation_level),
            start_time: Set(incident.start_time),
            end_time: Set(incident.end_time),
            assigned_to: Set(incident.assigned_to),
            resolved_by: Set(incident.resolved_by),
            updated_at: Set(incident.updated_at),
        }
    }
}

impl From<super::incident::Model> for Incident {
    fn from(model: super::incident::Model) -> Self {
        Self {
            id: model.id,
            device_id: model.device_id,
            alert_id: model.alert_id,
            description: model.description,
            status: IncidentStatus::from_str(&model.status),
            alert_count: model.alert_count,
            current_escalation_level: model.current_escalation_level,
            start_time: model.start_time,
            end_time: model.end_time,
            assigned_to: model.assigned_to,
            resolved_by: model.resolved_by,
            updated_at: model.updated_at,
        }
    }
}

/// TimelineEvent 模型与数据库实体的转换
impl From<TimelineEvent> for super::incident_timeline_event::ActiveModel {
    fn from(event: TimelineEvent) -> Self {
        Self {
            id: if event.id == 0 { NotSet } else { Set(event.id) },
            incident_id: Set(event.incident_id),
            event_type: Set(event.event_type.as_str().to_string()),
            timestamp: Set(event.timestamp),
            description: Set(event.description),
            temperature: Set(event.temperature),
            operator_id: Set(event.operator_id),
            metadata: Set(Some(event.metadata)),
        }
    }
}

impl From<super::incident_timeline_event::Model> for TimelineEvent {
    fn from(model: super::incident_timeline_event::Model) -> Self {
        Self {
            id: model.id,
            incident_id: model.incident_id,
            event_type: TimelineEventType::from_str(&model.event_type),
            timestamp: model.timestamp,
            description: model.description,
            temperature: model.temperature,
            operator_id: model.operator_id,
            metadata: model
                .metadata
                .unwrap_or_else(|| JsonValue::Object(Default::default())),
        }
    }
}

/// IncidentComment 模型与数据库实体的转换
impl From<IncidentComment> for super::incident_comment::ActiveModel {
    fn from(comment: IncidentComment) -> Self {
        Self {
            id: if comment.id == 0 { NotSet } else { Set(comment.id) },
            incident_id: Set(comment.incident_id),
            operator_id: Set(comment.operator_id),
            comment: Set(comment.comment),
            action_taken: Set(comment.action_taken),
            timestamp: Set(comment.timestamp),
        }
    }
}

impl From<super::incident_comment::Model> for IncidentComment {
    fn from(model: super::incident_comment::Model) -> Self {
        Self {
            id: model.id,
            incident_id: model.incident_id,
            operator_id: model.operator_id,
            comment: model.comment,
            action_taken: model.action_taken,
            timestamp: model.timestamp,
        }
    }
}
