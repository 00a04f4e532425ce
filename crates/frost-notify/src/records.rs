use crate::db::notification;
use crate::{Notification, NotificationStatus, NotifyError, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::debug;

/// 通知记录存储
///
/// 记录每一次投递尝试的状态流转
pub struct NotificationStore {
    db: Arc<DatabaseConnection>,
}

impl NotificationStore {
    /// 创建新的通知记录存储
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 登记一条待投递通知
    pub async fn insert(&self, notification: Notification) -> Result<Notification> {
        let active_model: notification::ActiveModel = notification.clone().into();
        notification::Entity::insert(active_model)
            .exec(&*self.db)
            .await?;

        debug!(
            notification_id = %notification.id,
            operator_id = %notification.operator_id,
            channel = %notification.channel.as_str(),
            "Notification recorded"
        );
        Ok(notification)
    }

    /// 获取通知记录
    pub async fn get(&self, notification_id: &str) -> Result<Option<Notification>> {
        let model = notification::Entity::find_by_id(notification_id.to_string())
            .one(&*self.db)
            .await?;
        Ok(model.map(Notification::from))
    }

    /// 标记发送成功
    pub async fn mark_sent(&self, notification_id: &str) -> Result<()> {
        let mut notification = self.require(notification_id).await?;
        notification.status = NotificationStatus::Sent;
        notification.sent_at = Some(Utc::now());
        notification.error = None;
        self.save(notification).await
    }

    /// 记录一次失败重试
    pub async fn mark_retry(&self, notification_id: &str, error: &str, retry_count: i32) -> Result<()> {
        let mut notification = self.require(notification_id).await?;
        notification.retry_count = retry_count;
        notification.error = Some(error.to_string());
        self.save(notification).await
    }

    /// 标记永久失败（重试耗尽）
    pub async fn mark_failed(&self, notification_id: &str, error: &str, retry_count: i32) -> Result<()> {
        let mut notification = self.require(notification_id).await?;
        notification.status = NotificationStatus::Failed;
        notification.retry_count = retry_count;
        notification.error = Some(error.to_string());
        self.save(notification).await
    }

    /// 标记已送达
    pub async fn mark_delivered(&self, notification_id: &str) -> Result<()> {
        let mut notification = self.require(notification_id).await?;
        notification.status = NotificationStatus::Delivered;
        notification.delivered_at = Some(Utc::now());
        self.save(notification).await
    }

    /// 标记已读
    pub async fn mark_read(&self, notification_id: &str) -> Result<()> {
        let mut notification = self.require(notification_id).await?;
        notification.status = NotificationStatus::Read;
        notification.read_at = Some(Utc::now());
        self.save(notification).await
    }

    /// 列出未读通知（已投出但还没有已读回执）
    pub async fn list_unread(&self, operator_id: &str) -> Result<Vec<Notification>> {
        let models = notification::Entity::find()
            .filter(notification::Column::OperatorId.eq(operator_id))
            .filter(notification::Column::Status.is_in(vec![
                NotificationStatus::Sent.as_str(),
                NotificationStatus::Delivered.as_str(),
            ]))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Notification::from).collect())
    }

    /// 列出投递失败的通知
    ///
    /// 重试耗尽的通知只在这里暴露，不会自动重投
    pub async fn list_failed(&self) -> Result<Vec<Notification>> {
        let models = notification::Entity::find()
            .filter(notification::Column::Status.eq(NotificationStatus::Failed.as_str()))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Notification::from).collect())
    }

    /// 列出事件关联的全部通知
    pub async fn list_for_incident(&self, incident_id: &str) -> Result<Vec<Notification>> {
        let models = notification::Entity::find()
            .filter(notification::Column::IncidentId.eq(incident_id))
            .order_by_asc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Notification::from).collect())
    }

    // ========== 私有辅助方法 ==========

    async fn require(&self, notification_id: &str) -> Result<Notification> {
        self.get(notification_id)
            .await?
            .ok_or_else(|| NotifyError::NotificationNotFound(notification_id.to_string()))
    }

    async fn save(&self, notification: Notification) -> Result<()> {
        let active_model: notification::ActiveModel = notification.into();
        active_model.update(&*self.db).await?;
        Ok(())
    }
}
