use crate::db::incident_timeline_event;
use crate::{Alert, IncidentStatus, Result, TimelineEvent, TimelineEventType};
use frost_notify::Operator;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::debug;

/// 事件时间线记录器
///
/// 每一次状态流转都追加一条不可变条目；
/// 条目只增不改不删，构成事件的审计轨迹
pub struct TimelineRecorder {
    db: Arc<DatabaseConnection>,
}

impl TimelineRecorder {
    /// 创建新的时间线记录器
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 追加一条条目
    pub async fn record(&self, event: TimelineEvent) -> Result<TimelineEvent> {
        let active_model: incident_timeline_event::ActiveModel = event.clone().into();
        let result = incident_timeline_event::Entity::insert(active_model)
            .exec(&*self.db)
            .await?;

        debug!(
            incident_id = %event.incident_id,
            event_type = %event.event_type.as_str(),
            "Timeline event recorded"
        );

        Ok(TimelineEvent {
            id: result.last_insert_id,
            ..event
        })
    }

    /// 按时间顺序列出事件的全部条目
    pub async fn list(&self, incident_id: &str) -> Result<Vec<TimelineEvent>> {
        let models = incident_timeline_event::Entity::find()
            .filter(incident_timeline_event::Column::IncidentId.eq(incident_id))
            .order_by_asc(incident_timeline_event::Column::Timestamp)
            .order_by_asc(incident_timeline_event::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(TimelineEvent::from).collect())
    }

    // ========== 常用条目构造 ==========

    /// 记录告警创建
    pub async fn alert_created(
        &self,
        incident_id: &str,
        alert: &Alert,
        temperature: Option<f64>,
    ) -> Result<TimelineEvent> {
        let mut event = TimelineEvent::new(
            incident_id.to_string(),
            TimelineEventType::AlertCreated,
            alert.message.clone(),
        )
        .with_metadata(serde_json::json!({
            "alert_id": alert.id,
            "alert_type": alert.alert_type.as_str(),
            "severity": alert.severity.as_str(),
        }));
        if let Some(t) = temperature {
            event = event.with_temperature(t);
        }
        self.record(event).await
    }

    /// 记录通知发出（每个值班员一条，不按渠道展开）
    pub async fn notification_sent(
        &self,
        incident_id: &str,
        operator: &Operator,
        level: i32,
    ) -> Result<TimelineEvent> {
        let event = TimelineEvent::new(
            incident_id.to_string(),
            TimelineEventType::NotificationSent,
            format!("Operator {} notified at escalation level {}", operator.name, level),
        )
        .with_operator(operator.id.clone())
        .with_metadata(serde_json::json!({ "escalation_level": level }));
        self.record(event).await
    }

    /// 记录备注
    pub async fn comment_added(
        &self,
        incident_id: &str,
        operator_id: &str,
        action_taken: bool,
    ) -> Result<TimelineEvent> {
        let event = TimelineEvent::new(
            incident_id.to_string(),
            TimelineEventType::CommentAdded,
            if action_taken {
                "Comment added (action taken)".to_string()
            } else {
                "Comment added".to_string()
            },
        )
        .with_operator(operator_id);
        self.record(event).await
    }

    /// 记录状态变更
    pub async fn status_changed(
        &self,
        incident_id: &str,
        from: IncidentStatus,
        to: IncidentStatus,
        description: String,
        operator_id: Option<&str>,
        temperature: Option<f64>,
    ) -> Result<TimelineEvent> {
        let mut event = TimelineEvent::new(
            incident_id.to_string(),
            TimelineEventType::StatusChanged,
            description,
        )
        .with_metadata(serde_json::json!({
            "from": from.as_str(),
            "to": to.as_str(),
        }));
        if let Some(op) = operator_id {
            event = event.with_operator(op);
        }
        if let Some(t) = temperature {
            event = event.with_temperature(t);
        }
        self.record(event).await
    }

    /// 记录升级层级变更
    pub async fn escalation_changed(
        &self,
        incident_id: &str,
        from_level: i32,
        to_level: i32,
        alert_count: i32,
    ) -> Result<TimelineEvent> {
        let event = TimelineEvent::new(
            incident_id.to_string(),
            TimelineEventType::EscalationChanged,
            format!(
                "Escalation raised from level {} to level {} after {} alerts",
                from_level, to_level, alert_count
            ),
        )
        .with_metadata(serde_json::json!({
            "from_level": from_level,
            "to_level": to_level,
            "alert_count": alert_count,
        }));
        self.record(event).await
    }
}
