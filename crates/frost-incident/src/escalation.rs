use crate::timeline::TimelineRecorder;
use crate::{Alert, AlertSeverity, Incident, NotifyPolicy, Result};
use frost_device::Device;
use frost_notify::{
    DispatchRequest, Notification, NotificationStore, NotifyDispatcher, NotifyLevel,
    NotifyMessage, OperatorDirectory,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 升级通知器
///
/// 把升级层级映射到值班员梯队并触发投递。
/// 通知记录先持久化为 pending 再入队，投递失败不回写事件状态。
pub struct EscalationNotifier {
    /// 值班员名录
    operators: Arc<OperatorDirectory>,

    /// 通知记录存储
    records: Arc<NotificationStore>,

    /// 投递器
    dispatcher: Arc<NotifyDispatcher>,

    /// 时间线记录器
    timeline: Arc<TimelineRecorder>,

    /// 通知层级策略
    policy: NotifyPolicy,
}

impl EscalationNotifier {
    /// 创建新的升级通知器
    pub fn new(
        operators: Arc<OperatorDirectory>,
        records: Arc<NotificationStore>,
        dispatcher: Arc<NotifyDispatcher>,
        timeline: Arc<TimelineRecorder>,
        policy: NotifyPolicy,
    ) -> Self {
        Self {
            operators,
            records,
            dispatcher,
            timeline,
            policy,
        }
    }

    /// 向指定升级层级的值班员发出事件通知
    ///
    /// 每个（值班员, 可用渠道）登记一条投递；
    /// 任一渠道入队成功即为该值班员追加一条 notification_sent 时间线条目
    ///
    /// # 返回
    /// 实际触达的值班员数量
    pub async fn notify(
        &self,
        incident: &Incident,
        device: &Device,
        alert: &Alert,
        level: i32,
    ) -> Result<usize> {
        let operators = match self.policy {
            NotifyPolicy::NewTierOnly => self.operators.active_by_tier(level).await?,
            NotifyPolicy::UpToLevel => self.operators.active_up_to_tier(level).await?,
        };

        if operators.is_empty() {
            warn!(
                incident_id = %incident.id,
                level = level,
                "No active operators for escalation level"
            );
            return Ok(0);
        }

        let message = Self::build_message(incident, device, alert, level);
        let mut notified = 0;

        for operator in &operators {
            let channels = operator.channels();
            if channels.is_empty() {
                warn!(
                    operator_id = %operator.id,
                    "Operator has no usable notification channel"
                );
                continue;
            }

            let mut queued = false;
            for (channel, address) in channels {
                let notification = Notification::new(operator.id.clone(), channel, address)
                    .for_incident(incident.id.clone())
                    .for_alert(alert.id.clone());
                let notification = self.records.insert(notification).await?;
                self.dispatcher.enqueue(DispatchRequest {
                    notification,
                    message: message.clone(),
                })?;
                queued = true;
            }

            if queued {
                self.timeline
                    .notification_sent(&incident.id, operator, level)
                    .await?;
                notified += 1;
            }
        }

        info!(
            incident_id = %incident.id,
            level = level,
            operators = notified,
            "Escalation notifications dispatched"
        );
        Ok(notified)
    }

    /// 发出不关联事件的低优先级提示（市电恢复、电量不足）
    ///
    /// 只触达一级值班员，不追加时间线条目
    pub async fn notify_informational(&self, device: &Device, alert: &Alert) -> Result<usize> {
        let operators = self.operators.active_by_tier(1).await?;
        if operators.is_empty() {
            debug!(device_id = %device.id, "No tier-1 operators for informational notice");
            return Ok(0);
        }

        let message = NotifyMessage::new(
            format!("Notice: {}", device.name),
            format!(
                "Device: {} ({})\n{}",
                device.name,
                device.location.as_deref().unwrap_or("unknown location"),
                alert.message
            ),
            Self::notify_level(alert.severity),
        );

        let mut notified = 0;
        for operator in &operators {
            let mut queued = false;
            for (channel, address) in operator.channels() {
                let notification = Notification::new(operator.id.clone(), channel, address)
                    .for_alert(alert.id.clone());
                let notification = self.records.insert(notification).await?;
                self.dispatcher.enqueue(DispatchRequest {
                    notification,
                    message: message.clone(),
                })?;
                queued = true;
            }
            if queued {
                notified += 1;
            }
        }

        Ok(notified)
    }

    // ========== 私有辅助方法 ==========

    /// 组装渠道通用的告警消息
    fn build_message(
        incident: &Incident,
        device: &Device,
        alert: &Alert,
        level: i32,
    ) -> NotifyMessage {
        NotifyMessage::new(
            format!("Cold storage alert: {}", device.name),
            format!(
                "Device: {} ({})\n{}\nEscalation level: {}\nAlert count: {}",
                device.name,
                device.location.as_deref().unwrap_or("unknown location"),
                alert.message,
                level,
                incident.alert_count
            ),
            Self::notify_level(alert.severity),
        )
        .with_metadata(serde_json::json!({
            "incident_id": incident.id,
            "alert_id": alert.id,
            "device_id": device.id,
            "escalation_level": level,
        }))
    }

    fn notify_level(severity: AlertSeverity) -> NotifyLevel {
        match severity {
            AlertSeverity::Info => NotifyLevel::Info,
            AlertSeverity::Warning => NotifyLevel::Warning,
            AlertSeverity::Critical => NotifyLevel::Critical,
            AlertSeverity::Severe => NotifyLevel::Severe,
        }
    }
}
