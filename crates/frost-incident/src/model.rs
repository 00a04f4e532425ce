use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    /// 温度偏高
    HighTemperature,
    /// 温度偏低
    LowTemperature,
    /// 断电（切换到电池供电）
    PowerFailure,
    /// 市电恢复
    PowerRestored,
    /// 电池电量不足
    LowBattery,
    /// 设备失联
    ConnectionLost,
}

impl AlertType {
    pub fn as_str(&self) -> &str {
        match self {
            AlertType::HighTemperature => "high_temperature",
            AlertType::LowTemperature => "low_temperature",
            AlertType::PowerFailure => "power_failure",
            AlertType::PowerRestored => "power_restored",
            AlertType::LowBattery => "low_battery",
            AlertType::ConnectionLost => "connection_lost",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "low_temperature" => AlertType::LowTemperature,
            "power_failure" => AlertType::PowerFailure,
            "power_restored" => AlertType::PowerRestored,
            "low_battery" => AlertType::LowBattery,
            "connection_lost" => AlertType::ConnectionLost,
            _ => AlertType::HighTemperature,
        }
    }
}

/// 告警严重度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// 信息
    Info,
    /// 警告
    Warning,
    /// 临界
    Critical,
    /// 严重
    Severe,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
            AlertSeverity::Severe => "severe",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "info" => AlertSeverity::Info,
            "critical" => AlertSeverity::Critical,
            "severe" => AlertSeverity::Severe,
            _ => AlertSeverity::Warning,
        }
    }
}

/// 一条告警
///
/// 由一条异常读数派生；类型与严重度创建后不再变化，
/// 只有处理状态字段可以更新
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 告警 ID
    pub id: String,

    /// 设备 ID
    pub device_id: String,

    /// 来源读数 ID（失联告警没有来源读数）
    pub reading_id: Option<i64>,

    /// 告警类型
    pub alert_type: AlertType,

    /// 严重度
    pub severity: AlertSeverity,

    /// 告警描述
    pub message: String,

    /// 是否已处理
    pub resolved: bool,

    /// 处理时间
    pub resolved_at: Option<DateTime<Utc>>,

    /// 处理人
    pub resolved_by: Option<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// 创建新告警
    pub fn new(
        device_id: String,
        reading_id: Option<i64>,
        alert_type: AlertType,
        severity: AlertSeverity,
        message: String,
    ) -> Self {
        Self {
            id: format!("alr_{}", uuid::Uuid::new_v4().simple()),
            device_id,
            reading_id,
            alert_type,
            severity,
            message,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
            created_at: Utc::now(),
        }
    }
}

/// 事件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentStatus {
    /// 进行中
    Open,
    /// 已确认
    Acknowledged,
    /// 排查中
    Investigating,
    /// 已解决
    Resolved,
    /// 已关闭
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::Acknowledged => "acknowledged",
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "acknowledged" => IncidentStatus::Acknowledged,
            "investigating" => IncidentStatus::Investigating,
            "resolved" => IncidentStatus::Resolved,
            "closed" => IncidentStatus::Closed,
            _ => IncidentStatus::Open,
        }
    }

    /// 是否属于进行中状态集合
    ///
    /// 同一设备同一时刻最多一个进行中事件的不变量即按此集合判定
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            IncidentStatus::Open | IncidentStatus::Acknowledged | IncidentStatus::Investigating
        )
    }

    /// 进行中状态集合的字符串形式（查询用）
    pub fn open_statuses() -> [&'static str; 3] {
        ["open", "acknowledged", "investigating"]
    }
}

/// 一次事件
///
/// 聚合同一设备一段连续异常期内的全部告警
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// 事件 ID
    pub id: String,

    /// 设备 ID
    pub device_id: String,

    /// 起始告警 ID
    pub alert_id: String,

    /// 事件描述
    pub description: String,

    /// 状态
    pub status: IncidentStatus,

    /// 累计告警数（异常期间单调递增）
    pub alert_count: i32,

    /// 当前升级层级（1-3，进行中只升不降）
    pub current_escalation_level: i32,

    /// 开始时间
    pub start_time: DateTime<Utc>,

    /// 结束时间
    pub end_time: Option<DateTime<Utc>>,

    /// 确认人
    pub assigned_to: Option<String>,

    /// 解决人
    pub resolved_by: Option<String>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// 创建新事件
    pub fn new(device_id: String, alert_id: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: format!("inc_{}", uuid::Uuid::new_v4().simple()),
            device_id,
            alert_id,
            description,
            status: IncidentStatus::Open,
            alert_count: 1,
            current_escalation_level: 1,
            start_time: now,
            end_time: None,
            assigned_to: None,
            resolved_by: None,
            updated_at: now,
        }
    }
}

/// 事件时间线条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineEventType {
    /// 告警创建
    AlertCreated,
    /// 通知已发出
    NotificationSent,
    /// 新增备注
    CommentAdded,
    /// 状态变更
    StatusChanged,
    /// 升级层级变更
    EscalationChanged,
}

impl TimelineEventType {
    pub fn as_str(&self) -> &str {
        match self {
            TimelineEventType::AlertCreated => "alert_created",
            TimelineEventType::NotificationSent => "notification_sent",
            TimelineEventType::CommentAdded => "comment_added",
            TimelineEventType::StatusChanged => "status_changed",
            TimelineEventType::EscalationChanged => "escalation_changed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "notification_sent" => TimelineEventType::NotificationSent,
            "comment_added" => TimelineEventType::CommentAdded,
            "status_changed" => TimelineEventType::StatusChanged,
            "escalation_changed" => TimelineEventType::EscalationChanged,
            _ => TimelineEventType::AlertCreated,
        }
    }
}

/// 事件时间线条目
///
/// 只追加不修改，构成事件的完整审计轨迹
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// 条目 ID
    pub id: i64,

    /// 事件 ID
    pub incident_id: String,

    /// 条目类型
    pub event_type: TimelineEventType,

    /// 时间
    pub timestamp: DateTime<Utc>,

    /// 描述
    pub description: String,

    /// 温度快照
    pub temperature: Option<f64>,

    /// 相关值班员
    pub operator_id: Option<String>,

    /// 结构化附加数据
    pub metadata: serde_json::Value,
}

impl TimelineEvent {
    /// 创建新条目
    pub fn new(
        incident_id: String,
        event_type: TimelineEventType,
        description: String,
    ) -> Self {
        Self {
            id: 0,
            incident_id,
            event_type,
            timestamp: Utc::now(),
            description,
            temperature: None,
            operator_id: None,
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_operator(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// 事件备注
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentComment {
    /// 备注 ID
    pub id: i64,

    /// 事件 ID
    pub incident_id: String,

    /// 值班员 ID
    pub operator_id: String,

    /// 备注内容
    pub comment: String,

    /// 是否已采取现场处置
    pub action_taken: bool,

    /// 时间
    pub timestamp: DateTime<Utc>,
}

/// 事件查询条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentFilter {
    /// 状态过滤
    pub status: Option<IncidentStatus>,
    /// 设备过滤
    pub device_id: Option<String>,
    /// 开始时间下界
    pub start: Option<DateTime<Utc>>,
    /// 开始时间上界
    pub end: Option<DateTime<Utc>>,
    /// 分页：页码
    pub page: Option<u64>,
    /// 分页：每页数量
    pub page_size: Option<u64>,
}

/// 升级通知策略
///
/// 历史版本在 "只通知新到达层级" 与 "通知不高于当前层级的全部值班员"
/// 之间摇摆，默认取前者，按部署需要可切换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// 只通知新到达的层级
    NewTierOnly,
    /// 通知不高于当前层级的全部层级
    UpToLevel,
}

/// 升级配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// 告警数达到该值时升至二级
    pub level2_at: i32,

    /// 告警数达到该值时升至三级
    pub level3_at: i32,

    /// 升级通知策略
    pub notify_policy: NotifyPolicy,

    /// 电池电量告警下限（%）
    pub low_battery_floor: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            level2_at: 4,
            level3_at: 7,
            notify_policy: NotifyPolicy::NewTierOnly,
            low_battery_floor: 20.0,
        }
    }
}

impl EscalationConfig {
    /// 按累计告警数计算应处层级
    pub fn level_for(&self, alert_count: i32) -> i32 {
        if alert_count >= self.level3_at {
            3
        } else if alert_count >= self.level2_at {
            2
        } else {
            1
        }
    }
}

/// 异常读数驱动状态机后的结果
#[derive(Debug, Clone)]
pub enum IncidentOutcome {
    /// 新事件已创建
    Created(Incident),
    /// 既有事件已累积
    Updated {
        incident: Incident,
        escalated: bool,
    },
}

impl IncidentOutcome {
    pub fn incident(&self) -> &Incident {
        match self {
            IncidentOutcome::Created(incident) => incident,
            IncidentOutcome::Updated { incident, .. } => incident,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_incident_defaults() {
        let incident = Incident::new(
            "coldroom-a-01".to_string(),
            "alr_1".to_string(),
            "温度越限".to_string(),
        );
        assert!(incident.id.starts_with("inc_"));
        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(incident.alert_count, 1);
        assert_eq!(incident.current_escalation_level, 1);
        assert!(incident.end_time.is_none());
    }

    #[test]
    fn test_open_status_set() {
        assert!(IncidentStatus::Open.is_open());
        assert!(IncidentStatus::Acknowledged.is_open());
        assert!(IncidentStatus::Investigating.is_open());
        assert!(!IncidentStatus::Resolved.is_open());
        assert!(!IncidentStatus::Closed.is_open());
    }

    #[test]
    fn test_escalation_level_for() {
        let config = EscalationConfig::default();
        assert_eq!(config.level_for(1), 1);
        assert_eq!(config.level_for(3), 1);
        assert_eq!(config.level_for(4), 2);
        assert_eq!(config.level_for(6), 2);
        assert_eq!(config.level_for(7), 3);
        assert_eq!(config.level_for(20), 3);
    }

    #[test]
    fn test_alert_type_round_trip() {
        for t in [
            AlertType::HighTemperature,
            AlertType::LowTemperature,
            AlertType::PowerFailure,
            AlertType::PowerRestored,
            AlertType::LowBattery,
            AlertType::ConnectionLost,
        ] {
            assert_eq!(AlertType::from_str(t.as_str()), t);
        }
    }
}
