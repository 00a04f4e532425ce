use crate::alerts::AlertStore;
use crate::{AlertType, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

/// 告警去重器
///
/// 滑动窗口抑制：同设备同类型告警在重置窗口内只放行一条，
/// 每条放行的告警都会重置窗口起点。
/// 传感器每隔几分钟上报一次，持续越限时没有抑制会把值班员淹没。
pub struct AlertDeduplicator {
    alerts: Arc<AlertStore>,
}

impl AlertDeduplicator {
    /// 创建新的去重器
    pub fn new(alerts: Arc<AlertStore>) -> Self {
        Self { alerts }
    }

    /// 判定是否放行新告警
    ///
    /// # 参数
    /// * `device_id` - 设备 ID
    /// * `alert_type` - 告警类型
    /// * `window` - 告警重置窗口（来自当前阈值策略）
    /// * `now` - 判定时刻
    pub async fn should_alert(
        &self,
        device_id: &str,
        alert_type: AlertType,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let latest = self.alerts.latest_of_type(device_id, alert_type).await?;

        match latest {
            Some(alert) if now.signed_duration_since(alert.created_at) < window => {
                debug!(
                    device_id = %device_id,
                    alert_type = %alert_type.as_str(),
                    last_alert = %alert.id,
                    "Alert suppressed within reset window"
                );
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}
