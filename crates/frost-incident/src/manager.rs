use crate::db::{incident, incident_comment};
use crate::escalation::EscalationNotifier;
use crate::timeline::TimelineRecorder;
use crate::{
    Alert, EscalationConfig, Incident, IncidentComment, IncidentError, IncidentFilter,
    IncidentOutcome, IncidentStatus, Result, TimelineEvent,
};
use chrono::Utc;
use frost_device::Device;
use frost_telemetry::Reading;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// 事件状态机
///
/// 事件生命周期的唯一所有者：创建、累积、升级、自动/人工解决。
/// 同一设备的全部状态流转在设备锁内串行执行，
/// "同一设备最多一个进行中事件" 的不变量由这里维护，不依赖存储层约束。
pub struct IncidentManager {
    /// 数据库连接
    db: Arc<DatabaseConnection>,

    /// 时间线记录器
    timeline: Arc<TimelineRecorder>,

    /// 升级通知器
    escalation: Arc<EscalationNotifier>,

    /// 升级配置
    config: EscalationConfig,

    /// 设备锁表（设备ID -> 互斥锁）
    device_locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl IncidentManager {
    /// 创建新的事件状态机
    pub fn new(
        db: Arc<DatabaseConnection>,
        timeline: Arc<TimelineRecorder>,
        escalation: Arc<EscalationNotifier>,
        config: EscalationConfig,
    ) -> Self {
        Self {
            db,
            timeline,
            escalation,
            config,
            device_locks: RwLock::new(HashMap::new()),
        }
    }

    /// 异常读数驱动：创建或累积事件
    ///
    /// 告警必须已通过去重放行并落库；被抑制的告警不会走到这里，
    /// 也就不会累积 alert_count。
    /// 升级只在累计数到达配置阈值时发生，层级只升不降；
    /// 新层级的值班员收到通知，已通知过的层级不重复触达。
    ///
    /// # 参数
    /// * `device` - 设备
    /// * `alert` - 已落库的告警
    /// * `temperature` - 触发读数的温度快照
    pub async fn record_abnormal(
        &self,
        device: &Device,
        alert: &Alert,
        temperature: Option<f64>,
    ) -> Result<IncidentOutcome> {
        let lock = self.device_lock(&device.id).await;
        let _guard = lock.lock().await;

        let open = self.find_open(&device.id).await?;

        match open.into_iter().next() {
            None => {
                let incident = Incident::new(
                    device.id.clone(),
                    alert.id.clone(),
                    alert.message.clone(),
                );

                let active_model: incident::ActiveModel = incident.clone().into();
                incident::Entity::insert(active_model).exec(&*self.db).await?;

                info!(
                    incident_id = %incident.id,
                    device_id = %device.id,
                    alert_id = %alert.id,
                    "Incident opened"
                );

                self.timeline
                    .alert_created(&incident.id, alert, temperature)
                    .await?;
                self.escalation.notify(&incident, device, alert, 1).await?;

                Ok(IncidentOutcome::Created(incident))
            }
            Some(mut incident) => {
                incident.alert_count += 1;

                let target_level = self.config.level_for(incident.alert_count);
                let escalated = target_level > incident.current_escalation_level;
                let old_level = incident.current_escalation_level;
                if escalated {
                    incident.current_escalation_level = target_level;
                }

                self.save(&mut incident).await?;
                self.timeline
                    .alert_created(&incident.id, alert, temperature)
                    .await?;

                if escalated {
                    info!(
                        incident_id = %incident.id,
                        old_level = old_level,
                        new_level = target_level,
                        alert_count = incident.alert_count,
                        "Incident escalated"
                    );
                    self.timeline
                        .escalation_changed(
                            &incident.id,
                            old_level,
                            target_level,
                            incident.alert_count,
                        )
                        .await?;
                    self.escalation
                        .notify(&incident, device, alert, target_level)
                        .await?;
                }

                Ok(IncidentOutcome::Updated {
                    incident,
                    escalated,
                })
            }
        }
    }

    /// 正常读数驱动：自动解决设备的进行中事件
    ///
    /// 以当前被评估的读数为准，不再另查最新读数，乱序到达下行为一致。
    /// 按进行中状态集合扫描，不假设存储层保证唯一，
    /// 历史数据里同设备的多个进行中事件一并收敛。
    pub async fn auto_resolve(&self, device_id: &str, reading: &Reading) -> Result<Vec<Incident>> {
        let lock = self.device_lock(device_id).await;
        let _guard = lock.lock().await;

        let open = self.find_open(device_id).await?;
        if open.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved = Vec::new();
        for mut incident in open {
            let from = incident.status;
            incident.status = IncidentStatus::Resolved;
            incident.end_time = Some(Utc::now());
            self.save(&mut incident).await?;

            self.timeline
                .status_changed(
                    &incident.id,
                    from,
                    IncidentStatus::Resolved,
                    format!(
                        "Temperature back in normal range: {:.1}°C",
                        reading.temperature
                    ),
                    None,
                    Some(reading.temperature),
                )
                .await?;

            info!(
                incident_id = %incident.id,
                device_id = %device_id,
                "Incident auto-resolved"
            );
            resolved.push(incident);
        }

        Ok(resolved)
    }

    /// 值班员确认事件
    ///
    /// 仅允许从 open / investigating 确认；
    /// `normal_temperature` 为 Some 时表示设备最新读数已回到正常区间，
    /// 确认后在同一次操作内级联解决，时间线上是两条独立条目
    ///
    /// # 错误
    /// * `NotFound` - 事件不存在
    /// * `Conflict` - 当前状态不允许确认
    pub async fn acknowledge(
        &self,
        incident_id: &str,
        operator_id: &str,
        note: Option<&str>,
        normal_temperature: Option<f64>,
    ) -> Result<Incident> {
        let mut incident = self.require(incident_id).await?;
        let lock = self.device_lock(&incident.device_id).await;
        let _guard = lock.lock().await;

        // 锁内重读，避免与摄取路径竞争
        incident = self.require(incident_id).await?;

        match incident.status {
            IncidentStatus::Open | IncidentStatus::Investigating => {}
            status => {
                return Err(IncidentError::conflict(format!(
                    "Cannot acknowledge incident {} in status {}",
                    incident_id,
                    status.as_str()
                )));
            }
        }

        let from = incident.status;
        incident.status = IncidentStatus::Acknowledged;
        incident.assigned_to = Some(operator_id.to_string());
        self.save(&mut incident).await?;

        let description = match note {
            Some(note) => format!("Acknowledged by operator: {}", note),
            None => "Acknowledged by operator".to_string(),
        };
        self.timeline
            .status_changed(
                incident_id,
                from,
                IncidentStatus::Acknowledged,
                description,
                Some(operator_id),
                None,
            )
            .await?;

        // 最新读数已回到正常区间时级联解决
        if let Some(temperature) = normal_temperature {
            incident.status = IncidentStatus::Resolved;
            incident.end_time = Some(Utc::now());
            incident.resolved_by = Some(operator_id.to_string());
            self.save(&mut incident).await?;

            self.timeline
                .status_changed(
                    incident_id,
                    IncidentStatus::Acknowledged,
                    IncidentStatus::Resolved,
                    format!(
                        "Latest reading back in normal range: {:.1}°C",
                        temperature
                    ),
                    Some(operator_id),
                    Some(temperature),
                )
                .await?;

            info!(
                incident_id = %incident_id,
                operator_id = %operator_id,
                "Incident acknowledged and resolved in one action"
            );
        } else {
            info!(
                incident_id = %incident_id,
                operator_id = %operator_id,
                "Incident acknowledged"
            );
        }

        Ok(incident)
    }

    /// 值班员手工解决事件
    ///
    /// # 错误
    /// * `Conflict` - 事件已解决或已关闭
    pub async fn resolve(&self, incident_id: &str, operator_id: &str) -> Result<Incident> {
        let mut incident = self.require(incident_id).await?;
        let lock = self.device_lock(&incident.device_id).await;
        let _guard = lock.lock().await;

        incident = self.require(incident_id).await?;

        if !incident.status.is_open() {
            return Err(IncidentError::conflict(format!(
                "Cannot resolve incident {} in status {}",
                incident_id,
                incident.status.as_str()
            )));
        }

        let from = incident.status;
        incident.status = IncidentStatus::Resolved;
        incident.end_time = Some(Utc::now());
        incident.resolved_by = Some(operator_id.to_string());
        self.save(&mut incident).await?;

        self.timeline
            .status_changed(
                incident_id,
                from,
                IncidentStatus::Resolved,
                "Resolved by operator".to_string(),
                Some(operator_id),
                None,
            )
            .await?;

        info!(incident_id = %incident_id, operator_id = %operator_id, "Incident resolved");
        Ok(incident)
    }

    /// 标记排查中
    ///
    /// # 错误
    /// * `Conflict` - 仅允许从 open / acknowledged 进入
    pub async fn mark_investigating(
        &self,
        incident_id: &str,
        operator_id: &str,
    ) -> Result<Incident> {
        let mut incident = self.require(incident_id).await?;
        let lock = self.device_lock(&incident.device_id).await;
        let _guard = lock.lock().await;

        incident = self.require(incident_id).await?;

        match incident.status {
            IncidentStatus::Open | IncidentStatus::Acknowledged => {}
            status => {
                return Err(IncidentError::conflict(format!(
                    "Cannot investigate incident {} in status {}",
                    incident_id,
                    status.as_str()
                )));
            }
        }

        let from = incident.status;
        incident.status = IncidentStatus::Investigating;
        incident.assigned_to = Some(operator_id.to_string());
        self.save(&mut incident).await?;

        self.timeline
            .status_changed(
                incident_id,
                from,
                IncidentStatus::Investigating,
                "Investigation started".to_string(),
                Some(operator_id),
                None,
            )
            .await?;

        Ok(incident)
    }

    /// 关闭事件
    ///
    /// closed 为终态，只能从 resolved 进入，之后不再有任何流转
    pub async fn close(&self, incident_id: &str) -> Result<Incident> {
        let mut incident = self.require(incident_id).await?;
        let lock = self.device_lock(&incident.device_id).await;
        let _guard = lock.lock().await;

        incident = self.require(incident_id).await?;

        if incident.status != IncidentStatus::Resolved {
            return Err(IncidentError::conflict(format!(
                "Cannot close incident {} in status {}",
                incident_id,
                incident.status.as_str()
            )));
        }

        incident.status = IncidentStatus::Closed;
        self.save(&mut incident).await?;

        self.timeline
            .status_changed(
                incident_id,
                IncidentStatus::Resolved,
                IncidentStatus::Closed,
                "Incident closed".to_string(),
                None,
                None,
            )
            .await?;

        Ok(incident)
    }

    /// 追加备注
    ///
    /// 已关闭的事件不再接受备注；
    /// 标记已采取处置的备注同时执行确认流转（事件已确认时只记备注）
    pub async fn add_comment(
        &self,
        incident_id: &str,
        operator_id: &str,
        comment: String,
        action_taken: bool,
    ) -> Result<IncidentComment> {
        if comment.trim().is_empty() {
            return Err(IncidentError::validation("Comment cannot be empty"));
        }

        let incident = self.require(incident_id).await?;
        if incident.status == IncidentStatus::Closed {
            return Err(IncidentError::conflict(format!(
                "Cannot comment on closed incident {}",
                incident_id
            )));
        }

        let record = IncidentComment {
            id: 0,
            incident_id: incident_id.to_string(),
            operator_id: operator_id.to_string(),
            comment,
            action_taken,
            timestamp: Utc::now(),
        };

        let active_model: incident_comment::ActiveModel = record.clone().into();
        let result = incident_comment::Entity::insert(active_model)
            .exec(&*self.db)
            .await?;

        self.timeline
            .comment_added(incident_id, operator_id, action_taken)
            .await?;

        // 已采取处置的备注隐含一次确认
        if action_taken && matches!(incident.status, IncidentStatus::Open | IncidentStatus::Investigating) {
            self.acknowledge(incident_id, operator_id, None, None).await?;
        }

        Ok(IncidentComment {
            id: result.last_insert_id,
            ..record
        })
    }

    // ========== 查询 ==========

    /// 获取事件
    pub async fn get(&self, incident_id: &str) -> Result<Option<Incident>> {
        let model = incident::Entity::find_by_id(incident_id.to_string())
            .one(&*self.db)
            .await?;
        Ok(model.map(Incident::from))
    }

    /// 获取事件，不存在时报错
    pub async fn require(&self, incident_id: &str) -> Result<Incident> {
        self.get(incident_id)
            .await?
            .ok_or_else(|| IncidentError::NotFound(incident_id.to_string()))
    }

    /// 按条件列出事件
    pub async fn list(&self, filter: IncidentFilter) -> Result<Vec<Incident>> {
        let mut query = incident::Entity::find();

        if let Some(status) = &filter.status {
            query = query.filter(incident::Column::Status.eq(status.as_str()));
        }
        if let Some(device_id) = &filter.device_id {
            query = query.filter(incident::Column::DeviceId.eq(device_id));
        }
        if let Some(start) = filter.start {
            query = query.filter(incident::Column::StartTime.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(incident::Column::StartTime.lte(end));
        }

        query = query.order_by_desc(incident::Column::StartTime);

        let page = filter.page.unwrap_or(1);
        let page_size = filter.page_size.unwrap_or(20);

        let models = query
            .paginate(&*self.db, page_size)
            .fetch_page(page - 1)
            .await?;

        Ok(models.into_iter().map(Incident::from).collect())
    }

    /// 事件时间线
    pub async fn timeline(&self, incident_id: &str) -> Result<Vec<TimelineEvent>> {
        self.require(incident_id).await?;
        self.timeline.list(incident_id).await
    }

    /// 事件备注列表
    pub async fn comments(&self, incident_id: &str) -> Result<Vec<IncidentComment>> {
        self.require(incident_id).await?;

        let models = incident_comment::Entity::find()
            .filter(incident_comment::Column::IncidentId.eq(incident_id))
            .order_by_desc(incident_comment::Column::Timestamp)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(IncidentComment::from).collect())
    }

    /// 设备的进行中事件
    pub async fn find_open(&self, device_id: &str) -> Result<Vec<Incident>> {
        let models = incident::Entity::find()
            .filter(incident::Column::DeviceId.eq(device_id))
            .filter(incident::Column::Status.is_in(IncidentStatus::open_statuses()))
            .order_by_asc(incident::Column::StartTime)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Incident::from).collect())
    }

    // ========== 私有辅助方法 ==========

    /// 取设备锁（按需创建）
    async fn device_lock(&self, device_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.device_locks.read().await;
            if let Some(lock) = locks.get(device_id) {
                return lock.clone();
            }
        }

        let mut locks = self.device_locks.write().await;
        locks
            .entry(device_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn save(&self, incident: &mut Incident) -> Result<()> {
        incident.updated_at = Utc::now();
        let active_model: incident::ActiveModel = incident.clone().into();
        active_model.update(&*self.db).await?;
        Ok(())
    }
}
