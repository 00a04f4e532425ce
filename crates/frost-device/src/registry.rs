use crate::db::device;
use crate::{Device, DeviceError, DeviceFilter, DeviceStatus, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 设备注册表
///
/// 负责设备的注册、查询和更新操作，
/// 支持内存缓存以提高查询性能
pub struct DeviceRegistry {
    /// 数据库连接
    pub(crate) db: Arc<DatabaseConnection>,

    /// 内存缓存（设备ID -> 设备信息）
    cache: Arc<RwLock<HashMap<String, Device>>>,

    /// 是否启用缓存
    cache_enabled: bool,
}

impl DeviceRegistry {
    /// 创建新的设备注册表
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_enabled: true,
        }
    }

    /// 创建不启用缓存的设备注册表（用于测试）
    pub fn new_without_cache(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_enabled: false,
        }
    }

    /// 注册设备
    ///
    /// # 参数
    /// * `device` - 要注册的设备信息
    ///
    /// # 错误
    /// * `AlreadyExists` - 设备ID已存在
    /// * `ValidationError` - 设备信息验证失败
    pub async fn register(&self, device: Device) -> Result<Device> {
        self.validate_device(&device)?;

        if self.exists(&device.id).await? {
            return Err(DeviceError::AlreadyExists(device.id.clone()));
        }

        let active_model: device::ActiveModel = device.clone().into();
        device::Entity::insert(active_model).exec(&*self.db).await?;

        info!(
            device_id = %device.id,
            device_name = %device.name,
            "Device registered"
        );

        self.cache_put(device.clone()).await;
        Ok(device)
    }

    /// 获取设备信息
    ///
    /// # 返回
    /// 设备信息，如果不存在则返回 None
    pub async fn get(&self, device_id: &str) -> Result<Option<Device>> {
        if self.cache_enabled {
            let cache = self.cache.read().await;
            if let Some(device) = cache.get(device_id) {
                debug!(device_id = %device_id, "Device found in cache");
                return Ok(Some(device.clone()));
            }
        }

        let model = device::Entity::find_by_id(device_id.to_string())
            .one(&*self.db)
            .await?;

        match model {
            Some(model) => {
                let device = Device::from(model);
                self.cache_put(device.clone()).await;
                Ok(Some(device))
            }
            None => {
                debug!(device_id = %device_id, "Device not found");
                Ok(None)
            }
        }
    }

    /// 读数到达时登记设备（get-or-create，幂等）
    ///
    /// 已注册的设备更新状态为在线并刷新最后读数时间；
    /// 未注册的设备以上报的 ID 自动建档。
    /// 引用了该设备的事件存在期间设备不会被删除。
    ///
    /// # 参数
    /// * `device_id` - 传感器上报的设备ID
    /// * `at` - 读数时间
    pub async fn touch(&self, device_id: &str, at: DateTime<Utc>) -> Result<Device> {
        if device_id.is_empty() {
            return Err(DeviceError::validation("Device ID cannot be empty"));
        }

        match self.get(device_id).await? {
            Some(mut device) => {
                // 乱序补传的旧读数不回拨最后读数时间
                let at = device.last_reading_at.map_or(at, |last| last.max(at));
                device.mark_reading(at);
                self.update(device_id, device).await
            }
            None => {
                let mut device =
                    Device::with_id(device_id.to_string(), device_id.to_string(), None);
                device.mark_reading(at);
                info!(device_id = %device_id, "Unknown device auto-registered on first reading");
                self.register(device).await
            }
        }
    }

    /// 更新设备信息
    ///
    /// # 错误
    /// * `NotFound` - 设备不存在
    /// * `ValidationError` - 设备信息验证失败
    pub async fn update(&self, device_id: &str, mut device: Device) -> Result<Device> {
        if !self.exists(device_id).await? {
            return Err(DeviceError::NotFound(device_id.to_string()));
        }

        self.validate_device(&device)?;
        device.updated_at = Utc::now();

        let active_model: device::ActiveModel = device.clone().into();
        active_model.update(&*self.db).await?;

        debug!(device_id = %device_id, status = ?device.status, "Device updated");

        self.cache_put(device.clone()).await;
        Ok(device)
    }

    /// 列出设备
    ///
    /// # 参数
    /// * `filter` - 过滤条件
    pub async fn list(&self, filter: DeviceFilter) -> Result<Vec<Device>> {
        let mut query = device::Entity::find();

        if let Some(status) = &filter.status {
            query = query.filter(device::Column::Status.eq(status.as_str()));
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                Condition::any()
                    .add(device::Column::Name.like(&pattern))
                    .add(device::Column::Id.like(&pattern))
                    .add(device::Column::Location.like(&pattern)),
            );
        }

        query = query.order_by_desc(device::Column::CreatedAt);

        let page = filter.page.unwrap_or(1);
        let page_size = filter.page_size.unwrap_or(20);

        let models = query
            .paginate(&*self.db, page_size)
            .fetch_page(page - 1)
            .await?;

        let devices: Vec<Device> = models.into_iter().map(Device::from).collect();
        debug!(count = devices.len(), "Devices listed from database");
        Ok(devices)
    }

    /// 列出所有设备（不分页，供失联巡检使用）
    pub async fn list_all(&self) -> Result<Vec<Device>> {
        let models = device::Entity::find().all(&*self.db).await?;
        Ok(models.into_iter().map(Device::from).collect())
    }

    /// 检查设备是否存在
    pub async fn exists(&self, device_id: &str) -> Result<bool> {
        if self.cache_enabled {
            let cache = self.cache.read().await;
            if cache.contains_key(device_id) {
                return Ok(true);
            }
        }

        let count = device::Entity::find_by_id(device_id.to_string())
            .count(&*self.db)
            .await?;

        Ok(count > 0)
    }

    /// 统计设备数量
    pub async fn count(&self, filter: DeviceFilter) -> Result<u64> {
        let mut query = device::Entity::find();

        if let Some(status) = &filter.status {
            query = query.filter(device::Column::Status.eq(status.as_str()));
        }

        let count = query.count(&*self.db).await?;
        Ok(count)
    }

    /// 设置设备状态
    pub async fn set_status(&self, device_id: &str, status: DeviceStatus) -> Result<Device> {
        let mut device = self
            .get(device_id)
            .await?
            .ok_or_else(|| DeviceError::NotFound(device_id.to_string()))?;

        let old_status = device.status;
        device.set_status(status);
        let device = self.update(device_id, device).await?;

        info!(
            device_id = %device_id,
            old_status = ?old_status,
            new_status = ?status,
            "Device status changed"
        );
        Ok(device)
    }

    /// 清空缓存
    pub async fn clear_cache(&self) {
        if self.cache_enabled {
            let mut cache = self.cache.write().await;
            cache.clear();
            info!("Device cache cleared");
        }
    }

    // ========== 私有辅助方法 ==========

    async fn cache_put(&self, device: Device) {
        if self.cache_enabled {
            let mut cache = self.cache.write().await;
            cache.insert(device.id.clone(), device);
        }
    }

    /// 验证设备信息
    fn validate_device(&self, device: &Device) -> Result<()> {
        if device.id.is_empty() {
            return Err(DeviceError::validation("Device ID cannot be empty"));
        }

        if device.name.is_empty() {
            return Err(DeviceError::validation("Device name cannot be empty"));
        }

        if device.name.len() > 255 {
            return Err(DeviceError::validation(
                "Device name too long (max 255 characters)",
            ));
        }

        if device.reporting_interval <= 0 {
            return Err(DeviceError::validation(
                "Reporting interval must be positive",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Database, Statement};

    async fn create_test_registry() -> DeviceRegistry {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        // 创建表结构
        db.execute(Statement::from_string(
            db.get_database_backend(),
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                location TEXT,
                status TEXT NOT NULL DEFAULT 'offline',
                reporting_interval INTEGER NOT NULL,
                last_reading_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#
            .to_string(),
        ))
        .await
        .unwrap();

        DeviceRegistry::new_without_cache(Arc::new(db))
    }

    #[tokio::test]
    async fn test_register_device() {
        let registry = create_test_registry().await;

        let device = Device::new("冷库温度计".to_string(), Some("冷库 A".to_string()));
        let registered = registry.register(device).await.unwrap();
        assert_eq!(registered.name, "冷库温度计");
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let registry = create_test_registry().await;

        let device = Device::new("冷库温度计".to_string(), None);
        registry.register(device.clone()).await.unwrap();

        // 尝试注册相同ID的设备
        let result = registry.register(device).await;
        assert!(matches!(result.unwrap_err(), DeviceError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_touch_creates_unknown_device() {
        let registry = create_test_registry().await;
        let now = Utc::now();

        let device = registry.touch("sensor-07", now).await.unwrap();
        assert_eq!(device.id, "sensor-07");
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.last_reading_at, Some(now));
    }

    #[tokio::test]
    async fn test_touch_is_idempotent() {
        let registry = create_test_registry().await;
        let first = Utc::now();
        let second = first + chrono::Duration::minutes(20);

        registry.touch("sensor-07", first).await.unwrap();
        let device = registry.touch("sensor-07", second).await.unwrap();

        assert_eq!(device.last_reading_at, Some(second));
        assert_eq!(registry.count(DeviceFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_touch_empty_id() {
        let registry = create_test_registry().await;

        let result = registry.touch("", Utc::now()).await;
        assert!(matches!(
            result.unwrap_err(),
            DeviceError::ValidationError(_)
        ));
    }

    #[tokio::test]
    async fn test_set_status() {
        let registry = create_test_registry().await;

        let device = Device::new("冷库温度计".to_string(), None);
        let device_id = device.id.clone();
        registry.register(device).await.unwrap();

        registry
            .set_status(&device_id, DeviceStatus::Warning)
            .await
            .unwrap();

        let device = registry.get(&device_id).await.unwrap().unwrap();
        assert_eq!(device.status, DeviceStatus::Warning);
    }

    #[tokio::test]
    async fn test_filter_by_status() {
        let registry = create_test_registry().await;

        registry.touch("sensor-01", Utc::now()).await.unwrap();
        let offline = Device::new("离线设备".to_string(), None);
        registry.register(offline).await.unwrap();

        let filter = DeviceFilter {
            status: Some(DeviceStatus::Online),
            ..Default::default()
        };
        let devices = registry.list(filter).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "sensor-01");
    }

    #[tokio::test]
    async fn test_update_nonexistent() {
        let registry = create_test_registry().await;

        let device = Device::new("幽灵设备".to_string(), None);
        let result = registry.update("nonexistent", device).await;
        assert!(matches!(result.unwrap_err(), DeviceError::NotFound(_)));
    }
}
