use crate::{IngestError, Result};
use chrono::{DateTime, Utc};
use frost_device::{Device, DeviceRegistry, LivenessMonitor};
use frost_incident::{
    Alert, AlertDeduplicator, AlertSeverity, AlertStore, AlertType, EscalationConfig,
    EscalationNotifier, Incident, IncidentComment, IncidentFilter, IncidentManager,
    PowerTransition, ReadingEvaluator, TimelineEvent, TimelineRecorder,
};
use frost_notify::{
    DispatchConfig, NotificationStore, NotifyDispatcher, Operator, OperatorDirectory,
};
use frost_settings::{SettingsStore, TempClass};
use frost_telemetry::{NewReading, PowerSource, Reading, ReadingQuery, ReadingStats, ReadingStore};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// 升级配置
    pub escalation: EscalationConfig,

    /// 投递配置
    pub dispatch: DispatchConfig,

    /// 失联判定的上报间隔倍数
    pub offline_multiplier: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            escalation: EscalationConfig::default(),
            dispatch: DispatchConfig::default(),
            offline_multiplier: 3,
        }
    }
}

/// 一条读数的原始上报载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub power_source: PowerSource,
    pub battery_level: f64,
    /// 缺省取服务端时间
    pub timestamp: Option<DateTime<Utc>>,
}

/// 一次摄取的结果
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// 已落库的读数
    pub reading: Reading,

    /// 本次触发的告警
    pub alerts: Vec<Alert>,

    /// 本次创建或累积的事件
    pub incident: Option<Incident>,

    /// 本次自动解决的事件
    pub resolved: Vec<Incident>,
}

/// 监控服务门面
///
/// 摄取管线：读数先落库，再更新设备档案，然后走评估 -> 去重 ->
/// 状态机 -> 通知。告警链路出错只计入健康计数，不影响读数入库，
/// 也不向上报设备返回失败。
/// 值班员操作同步执行，错误直接返回调用方。
pub struct IngestService {
    devices: Arc<DeviceRegistry>,
    monitor: Arc<LivenessMonitor>,
    readings: Arc<ReadingStore>,
    settings: Arc<SettingsStore>,
    alerts: Arc<AlertStore>,
    dedup: AlertDeduplicator,
    evaluator: ReadingEvaluator,
    incidents: Arc<IncidentManager>,
    escalation: Arc<EscalationNotifier>,
    operators: Arc<OperatorDirectory>,
    notifications: Arc<NotificationStore>,
    dispatcher: Arc<NotifyDispatcher>,

    /// 告警链路失败计数（运维健康信号）
    alerting_failures: AtomicU64,
}

impl IngestService {
    /// 按配置装配整套监控服务
    pub fn new(db: Arc<DatabaseConnection>, config: ServiceConfig) -> Self {
        let devices = Arc::new(DeviceRegistry::new(db.clone()));
        let monitor = Arc::new(LivenessMonitor::new(
            devices.clone(),
            config.offline_multiplier,
        ));
        let readings = Arc::new(ReadingStore::new(db.clone()));
        let settings = Arc::new(SettingsStore::new(db.clone()));
        let alerts = Arc::new(AlertStore::new(db.clone()));
        let dedup = AlertDeduplicator::new(alerts.clone());
        let evaluator = ReadingEvaluator::new(config.escalation.low_battery_floor);

        let operators = Arc::new(OperatorDirectory::new(db.clone()));
        let notifications = Arc::new(NotificationStore::new(db.clone()));
        let dispatcher = Arc::new(NotifyDispatcher::new(
            notifications.clone(),
            config.dispatch.clone(),
        ));
        let timeline = Arc::new(TimelineRecorder::new(db.clone()));
        let escalation = Arc::new(EscalationNotifier::new(
            operators.clone(),
            notifications.clone(),
            dispatcher.clone(),
            timeline.clone(),
            config.escalation.notify_policy,
        ));
        let incidents = Arc::new(IncidentManager::new(
            db,
            timeline,
            escalation.clone(),
            config.escalation.clone(),
        ));

        info!("Monitoring service assembled");

        Self {
            devices,
            monitor,
            readings,
            settings,
            alerts,
            dedup,
            evaluator,
            incidents,
            escalation,
            operators,
            notifications,
            dispatcher,
            alerting_failures: AtomicU64::new(0),
        }
    }

    /// 启动后台任务（投递 worker 与失联巡检）
    pub async fn start(&self) {
        self.dispatcher.start().await;
        self.monitor.start().await;
        info!("Monitoring service started");
    }

    /// 停止后台任务
    pub async fn stop(&self) {
        self.monitor.stop().await;
        self.dispatcher.stop().await;
        info!("Monitoring service stopped");
    }

    // ========== 读数摄取 ==========

    /// 摄取一条读数
    ///
    /// 读数校验失败同步返回 `ValidationError`，不产生任何状态；
    /// 读数落库之后告警链路的任何失败都不会丢读数
    pub async fn ingest(&self, payload: ReadingPayload) -> Result<IngestOutcome> {
        let reading = self
            .readings
            .insert(NewReading {
                device_id: payload.device_id,
                temperature: payload.temperature,
                humidity: payload.humidity,
                power_source: payload.power_source,
                battery_level: payload.battery_level,
                timestamp: payload.timestamp,
            })
            .await?;

        let device = self.devices.touch(&reading.device_id, reading.timestamp).await?;

        match self.apply_alerting(&device, &reading).await {
            Ok((alerts, incident, resolved)) => Ok(IngestOutcome {
                reading,
                alerts,
                incident,
                resolved,
            }),
            Err(e) => {
                self.alerting_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    device_id = %device.id,
                    reading_id = reading.id,
                    error = %e,
                    "Alerting pipeline failed, reading kept"
                );
                Ok(IngestOutcome {
                    reading,
                    alerts: Vec::new(),
                    incident: None,
                    resolved: Vec::new(),
                })
            }
        }
    }

    /// 失联巡检：为超时设备产生 connection_lost 告警
    ///
    /// 由定时任务驱动；告警走去重窗口，只通知不开事件
    pub async fn sweep_connection_lost(&self) -> Result<Vec<Alert>> {
        let policy = self.settings.current().await?;
        let window = policy.alert_reset_window();
        let now = Utc::now();

        let mut created = Vec::new();
        for device in self.monitor.stale_devices().await? {
            if !self
                .dedup
                .should_alert(&device.id, AlertType::ConnectionLost, window, now)
                .await?
            {
                continue;
            }

            let last_seen = device
                .last_reading_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            let alert = self
                .alerts
                .insert(Alert::new(
                    device.id.clone(),
                    None,
                    AlertType::ConnectionLost,
                    AlertSeverity::Warning,
                    format!("No readings received since {}", last_seen),
                ))
                .await?;
            self.escalation.notify_informational(&device, &alert).await?;
            created.push(alert);
        }

        Ok(created)
    }

    // ========== 事件操作 ==========

    /// 确认事件
    ///
    /// 确认时顺带检查设备最新读数，已回到正常区间则级联解决
    pub async fn acknowledge(
        &self,
        incident_id: &str,
        operator_id: &str,
        note: Option<&str>,
    ) -> Result<Incident> {
        self.require_active_operator(operator_id).await?;

        let incident = self.incidents.require(incident_id).await?;
        let policy = self.settings.current().await?;
        let normal_temperature = self
            .readings
            .latest(&incident.device_id)
            .await?
            .filter(|r| policy.classify(r.temperature) == TempClass::Normal)
            .map(|r| r.temperature);

        Ok(self
            .incidents
            .acknowledge(incident_id, operator_id, note, normal_temperature)
            .await?)
    }

    /// 手工解决事件
    pub async fn resolve_incident(&self, incident_id: &str, operator_id: &str) -> Result<Incident> {
        self.require_active_operator(operator_id).await?;
        Ok(self.incidents.resolve(incident_id, operator_id).await?)
    }

    /// 追加事件备注
    pub async fn add_comment(
        &self,
        incident_id: &str,
        operator_id: &str,
        comment: String,
        action_taken: bool,
    ) -> Result<IncidentComment> {
        self.require_active_operator(operator_id).await?;
        Ok(self
            .incidents
            .add_comment(incident_id, operator_id, comment, action_taken)
            .await?)
    }

    /// 按条件列出事件
    pub async fn list_incidents(&self, filter: IncidentFilter) -> Result<Vec<Incident>> {
        Ok(self.incidents.list(filter).await?)
    }

    /// 事件时间线
    pub async fn timeline(&self, incident_id: &str) -> Result<Vec<TimelineEvent>> {
        Ok(self.incidents.timeline(incident_id).await?)
    }

    /// 事件备注列表
    pub async fn comments(&self, incident_id: &str) -> Result<Vec<IncidentComment>> {
        Ok(self.incidents.comments(incident_id).await?)
    }

    // ========== 告警操作 ==========

    /// 列出未处理告警
    pub async fn active_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.list_active().await?)
    }

    /// 处理告警
    pub async fn resolve_alert(&self, alert_id: &str, operator_id: &str) -> Result<Alert> {
        self.require_active_operator(operator_id).await?;
        Ok(self.alerts.resolve(alert_id, operator_id).await?)
    }

    // ========== 统计与健康 ==========

    /// 时间范围内的温度统计
    pub async fn stats(
        &self,
        device_id: Option<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<ReadingStats>> {
        let mut query = ReadingQuery::new(start, end);
        if let Some(device_id) = device_id {
            query = query.with_device(device_id);
        }
        Ok(self.readings.stats(&query).await?)
    }

    /// 告警链路累计失败次数
    pub fn alerting_failures(&self) -> u64 {
        self.alerting_failures.load(Ordering::Relaxed)
    }

    // ========== 子系统访问 ==========

    pub fn devices(&self) -> &Arc<DeviceRegistry> {
        &self.devices
    }

    pub fn readings(&self) -> &Arc<ReadingStore> {
        &self.readings
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn operators(&self) -> &Arc<OperatorDirectory> {
        &self.operators
    }

    pub fn notifications(&self) -> &Arc<NotificationStore> {
        &self.notifications
    }

    pub fn dispatcher(&self) -> &Arc<NotifyDispatcher> {
        &self.dispatcher
    }

    pub fn incidents(&self) -> &Arc<IncidentManager> {
        &self.incidents
    }

    // ========== 私有辅助方法 ==========

    /// 告警链路：评估 -> 去重 -> 状态机 -> 通知
    async fn apply_alerting(
        &self,
        device: &Device,
        reading: &Reading,
    ) -> Result<(Vec<Alert>, Option<Incident>, Vec<Incident>)> {
        let policy = self.settings.current().await?;
        let preceding = self
            .readings
            .preceding(&reading.device_id, reading.timestamp)
            .await?;
        let evaluation = self
            .evaluator
            .evaluate(reading, &policy, preceding.as_ref());

        let window = policy.alert_reset_window();
        // 去重与告警时间都以读数时间为准，补传/乱序读数下窗口判定一致
        let now = reading.timestamp;
        let mut alerts = Vec::new();
        let mut incident = None;
        let mut resolved = Vec::new();

        // 温度信号：越限走状态机，回到正常区间自动解决
        if evaluation.temperature.is_abnormal {
            let alert_type = evaluation.temperature.alert_type();
            if self
                .dedup
                .should_alert(&device.id, alert_type, window, now)
                .await?
            {
                let alert = self
                    .alerts
                    .insert(Self::build_alert(
                        reading,
                        alert_type,
                        evaluation.temperature.severity,
                        ReadingEvaluator::temperature_message(reading, &policy),
                    ))
                    .await?;
                let outcome = self
                    .incidents
                    .record_abnormal(device, &alert, Some(reading.temperature))
                    .await?;
                incident = Some(outcome.incident().clone());
                alerts.push(alert);
            } else {
                debug!(
                    device_id = %device.id,
                    alert_type = %alert_type.as_str(),
                    "Temperature alert suppressed by dedup window"
                );
            }
        } else {
            resolved = self.incidents.auto_resolve(&device.id, reading).await?;
        }

        // 供电信号：断电开事件，恢复只作低优先级提示
        match evaluation.power {
            Some(PowerTransition::Failure) => {
                if self
                    .dedup
                    .should_alert(&device.id, AlertType::PowerFailure, window, now)
                    .await?
                {
                    let alert = self
                        .alerts
                        .insert(Self::build_alert(
                            reading,
                            AlertType::PowerFailure,
                            AlertSeverity::Severe,
                            "Power failure: device switched to battery".to_string(),
                        ))
                        .await?;
                    let outcome = self
                        .incidents
                        .record_abnormal(device, &alert, Some(reading.temperature))
                        .await?;
                    if incident.is_none() {
                        incident = Some(outcome.incident().clone());
                    }
                    alerts.push(alert);
                }
            }
            Some(PowerTransition::Restored) => {
                if self
                    .dedup
                    .should_alert(&device.id, AlertType::PowerRestored, window, now)
                    .await?
                {
                    let alert = self
                        .alerts
                        .insert(Self::build_alert(
                            reading,
                            AlertType::PowerRestored,
                            AlertSeverity::Info,
                            "Power restored: device back on line power".to_string(),
                        ))
                        .await?;
                    self.escalation.notify_informational(device, &alert).await?;
                    alerts.push(alert);
                }
            }
            None => {}
        }

        // 电量信号：只提示，不开事件
        if evaluation.low_battery
            && self
                .dedup
                .should_alert(&device.id, AlertType::LowBattery, window, now)
                .await?
        {
            let alert = self
                .alerts
                .insert(Self::build_alert(
                    reading,
                    AlertType::LowBattery,
                    AlertSeverity::Warning,
                    format!("Battery level {:.0}% is low", reading.battery_level),
                ))
                .await?;
            self.escalation.notify_informational(device, &alert).await?;
            alerts.push(alert);
        }

        Ok((alerts, incident, resolved))
    }

    /// 从读数派生告警
    ///
    /// 告警时间取读数时间而非落库时间，去重窗口对乱序读数同样成立
    fn build_alert(
        reading: &Reading,
        alert_type: AlertType,
        severity: AlertSeverity,
        message: String,
    ) -> Alert {
        let mut alert = Alert::new(
            reading.device_id.clone(),
            Some(reading.id),
            alert_type,
            severity,
            message,
        );
        alert.created_at = reading.timestamp;
        alert
    }

    async fn require_active_operator(&self, operator_id: &str) -> Result<Operator> {
        let operator = self.operators.require(operator_id).await?;
        if !operator.is_active {
            return Err(IngestError::AuthorizationError(format!(
                "Operator {} is not active",
                operator_id
            )));
        }
        Ok(operator)
    }
}
