use crate::db::alert;
use crate::{Alert, AlertType, IncidentError, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 告警存储
pub struct AlertStore {
    db: Arc<DatabaseConnection>,
}

impl AlertStore {
    /// 创建新的告警存储
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 写入一条告警
    pub async fn insert(&self, alert: Alert) -> Result<Alert> {
        let active_model: alert::ActiveModel = alert.clone().into();
        alert::Entity::insert(active_model).exec(&*self.db).await?;

        info!(
            alert_id = %alert.id,
            device_id = %alert.device_id,
            alert_type = %alert.alert_type.as_str(),
            severity = %alert.severity.as_str(),
            "Alert created"
        );
        Ok(alert)
    }

    /// 获取告警
    pub async fn get(&self, alert_id: &str) -> Result<Option<Alert>> {
        let model = alert::Entity::find_by_id(alert_id.to_string())
            .one(&*self.db)
            .await?;
        Ok(model.map(Alert::from))
    }

    /// 获取同设备同类型最近一条告警
    ///
    /// 去重判定的依据
    pub async fn latest_of_type(
        &self,
        device_id: &str,
        alert_type: AlertType,
    ) -> Result<Option<Alert>> {
        let model = alert::Entity::find()
            .filter(alert::Column::DeviceId.eq(device_id))
            .filter(alert::Column::AlertType.eq(alert_type.as_str()))
            .order_by_desc(alert::Column::CreatedAt)
            .one(&*self.db)
            .await?;
        Ok(model.map(Alert::from))
    }

    /// 列出未处理告警
    pub async fn list_active(&self) -> Result<Vec<Alert>> {
        let models = alert::Entity::find()
            .filter(alert::Column::Resolved.eq(false))
            .order_by_desc(alert::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Alert::from).collect())
    }

    /// 列出设备的全部告警
    pub async fn list_for_device(&self, device_id: &str) -> Result<Vec<Alert>> {
        let models = alert::Entity::find()
            .filter(alert::Column::DeviceId.eq(device_id))
            .order_by_desc(alert::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Alert::from).collect())
    }

    /// 处理告警
    ///
    /// 告警的类型与严重度不可变，处理只更新处理状态字段
    ///
    /// # 错误
    /// * `AlertNotFound` - 告警不存在
    /// * `Conflict` - 告警已处理
    pub async fn resolve(&self, alert_id: &str, operator_id: &str) -> Result<Alert> {
        let mut alert = self
            .get(alert_id)
            .await?
            .ok_or_else(|| IncidentError::AlertNotFound(alert_id.to_string()))?;

        if alert.resolved {
            return Err(IncidentError::conflict(format!(
                "Alert {} is already resolved",
                alert_id
            )));
        }

        alert.resolved = true;
        alert.resolved_at = Some(Utc::now());
        alert.resolved_by = Some(operator_id.to_string());

        let active_model: alert::ActiveModel = alert.clone().into();
        active_model.update(&*self.db).await?;

        debug!(alert_id = %alert_id, operator_id = %operator_id, "Alert resolved");
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertSeverity;
    use sea_orm::{ConnectionTrait, Database, Statement};

    async fn create_test_store() -> AlertStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        db.execute(Statement::from_string(
            db.get_database_backend(),
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                device_id TEXT NOT NULL,
                reading_id INTEGER,
                alert_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                message TEXT NOT NULL,
                resolved INTEGER NOT NULL,
                resolved_at TEXT,
                resolved_by TEXT,
                created_at TEXT NOT NULL
            )
            "#
            .to_string(),
        ))
        .await
        .unwrap();

        AlertStore::new(Arc::new(db))
    }

    fn high_temp_alert(device_id: &str) -> Alert {
        Alert::new(
            device_id.to_string(),
            Some(1),
            AlertType::HighTemperature,
            AlertSeverity::Critical,
            "Temperature 9.5°C outside normal range [2.0, 8.0]".to_string(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_list_active() {
        let store = create_test_store().await;

        store.insert(high_temp_alert("coldroom-a-01")).await.unwrap();
        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve() {
        let store = create_test_store().await;

        let alert = store.insert(high_temp_alert("coldroom-a-01")).await.unwrap();
        let resolved = store.resolve(&alert.id, "op_1").await.unwrap();

        assert!(resolved.resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("op_1"));
        assert!(store.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_twice_conflicts() {
        let store = create_test_store().await;

        let alert = store.insert(high_temp_alert("coldroom-a-01")).await.unwrap();
        store.resolve(&alert.id, "op_1").await.unwrap();

        let result = store.resolve(&alert.id, "op_2").await;
        assert!(matches!(result.unwrap_err(), IncidentError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_latest_of_type() {
        let store = create_test_store().await;

        let mut first = high_temp_alert("coldroom-a-01");
        first.created_at = Utc::now() - chrono::Duration::minutes(40);
        store.insert(first).await.unwrap();

        let second = high_temp_alert("coldroom-a-01");
        let second_id = second.id.clone();
        store.insert(second).await.unwrap();

        let latest = store
            .latest_of_type("coldroom-a-01", AlertType::HighTemperature)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second_id);

        // 其他类型没有记录
        let none = store
            .latest_of_type("coldroom-a-01", AlertType::PowerFailure)
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
