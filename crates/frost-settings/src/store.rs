use crate::db::system_settings;
use crate::{Result, ThresholdPolicy};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 设置单行表的固定主键
pub const SETTINGS_ROW_ID: i32 = 1;

/// 系统设置存储
///
/// 单行持久化 + 显式失效的读穿缓存。
/// 更新先落库再清缓存，保证缓存陈旧不会超过一个更新周期。
pub struct SettingsStore {
    /// 数据库连接
    db: Arc<DatabaseConnection>,

    /// 当前策略缓存
    cache: RwLock<Option<ThresholdPolicy>>,
}

impl SettingsStore {
    /// 创建新的设置存储
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            cache: RwLock::new(None),
        }
    }

    /// 获取当前阈值策略
    ///
    /// 先查缓存，未命中时从数据库读取；
    /// 首次访问时以默认值建行
    pub async fn current(&self) -> Result<ThresholdPolicy> {
        {
            let cache = self.cache.read().await;
            if let Some(policy) = cache.as_ref() {
                debug!("Threshold policy served from cache");
                return Ok(policy.clone());
            }
        }

        let model = system_settings::Entity::find_by_id(SETTINGS_ROW_ID)
            .one(&*self.db)
            .await?;

        let policy = match model {
            Some(model) => ThresholdPolicy::from(model),
            None => {
                let defaults = ThresholdPolicy::default();
                let active_model: system_settings::ActiveModel = defaults.clone().into();
                system_settings::Entity::insert(active_model)
                    .exec(&*self.db)
                    .await?;
                info!("System settings initialized with defaults");
                defaults
            }
        };

        let mut cache = self.cache.write().await;
        *cache = Some(policy.clone());
        Ok(policy)
    }

    /// 更新阈值策略
    ///
    /// 校验通过后落库并使缓存失效，调用返回后读取即可见新值
    ///
    /// # 错误
    /// * `ValidationError` - 阈值边界关系不成立
    pub async fn update(&self, mut policy: ThresholdPolicy) -> Result<ThresholdPolicy> {
        policy.validate()?;
        policy.updated_at = Utc::now();

        // 确保行已存在
        self.current().await?;

        let active_model: system_settings::ActiveModel = policy.clone().into();
        active_model.update(&*self.db).await?;

        self.invalidate().await;

        info!(
            normal_min = policy.normal_min,
            normal_max = policy.normal_max,
            critical_min = policy.critical_min,
            critical_max = policy.critical_max,
            "Threshold policy updated"
        );
        Ok(policy)
    }

    /// 使缓存失效
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        debug!("Settings cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Database, Statement};

    async fn create_test_store() -> SettingsStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        // 创建表结构
        db.execute(Statement::from_string(
            db.get_database_backend(),
            r#"
            CREATE TABLE IF NOT EXISTS system_settings (
                id INTEGER PRIMARY KEY,
                normal_min REAL NOT NULL,
                normal_max REAL NOT NULL,
                critical_min REAL NOT NULL,
                critical_max REAL NOT NULL,
                reading_interval INTEGER NOT NULL,
                alert_reset_time INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#
            .to_string(),
        ))
        .await
        .unwrap();

        SettingsStore::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_first_access_creates_defaults() {
        let store = create_test_store().await;

        let policy = store.current().await.unwrap();
        assert_eq!(policy.normal_min, 2.0);
        assert_eq!(policy.normal_max, 8.0);
        assert_eq!(policy.alert_reset_time, 30);
    }

    #[tokio::test]
    async fn test_update_visible_after_invalidation() {
        let store = create_test_store().await;

        // 预热缓存
        store.current().await.unwrap();

        let updated = ThresholdPolicy {
            normal_min: -18.0,
            normal_max: -15.0,
            critical_min: -20.0,
            critical_max: -12.0,
            ..Default::default()
        };
        store.update(updated).await.unwrap();

        // 更新后立即可见，无需等待缓存过期
        let policy = store.current().await.unwrap();
        assert_eq!(policy.normal_min, -18.0);
        assert_eq!(policy.critical_max, -12.0);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_policy() {
        let store = create_test_store().await;

        let bad = ThresholdPolicy {
            critical_min: 5.0,
            ..Default::default()
        };
        assert!(store.update(bad).await.is_err());

        // 原有策略不受影响
        let policy = store.current().await.unwrap();
        assert_eq!(policy.critical_min, 0.0);
    }
}
