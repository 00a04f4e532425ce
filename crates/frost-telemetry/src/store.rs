use crate::db::reading;
use crate::{NewReading, Reading, ReadingQuery, ReadingStats, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::debug;

/// 读数存储
///
/// 遥测数据的唯一入口，读数一经写入即不可变
pub struct ReadingStore {
    db: Arc<DatabaseConnection>,
}

impl ReadingStore {
    /// 创建新的读数存储
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 写入一条读数
    ///
    /// 校验失败的读数在持久化之前即被拒绝
    ///
    /// # 错误
    /// * `ValidationError` - 字段取值越界
    pub async fn insert(&self, new_reading: NewReading) -> Result<Reading> {
        new_reading.validate()?;

        let timestamp = new_reading.timestamp.unwrap_or_else(Utc::now);
        let reading = Reading {
            id: 0,
            device_id: new_reading.device_id,
            temperature: new_reading.temperature,
            humidity: new_reading.humidity,
            power_source: new_reading.power_source,
            battery_level: new_reading.battery_level,
            timestamp,
        };

        let active_model: reading::ActiveModel = reading.clone().into();
        let result = reading::Entity::insert(active_model).exec(&*self.db).await?;

        debug!(
            device_id = %reading.device_id,
            temperature = %reading.temperature,
            "Reading stored"
        );

        Ok(Reading {
            id: result.last_insert_id,
            ..reading
        })
    }

    /// 按 ID 获取读数
    pub async fn get(&self, id: i64) -> Result<Option<Reading>> {
        let model = reading::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(model.map(Reading::from))
    }

    /// 获取设备最新一条读数（按读数时间排序）
    pub async fn latest(&self, device_id: &str) -> Result<Option<Reading>> {
        let model = reading::Entity::find()
            .filter(reading::Column::DeviceId.eq(device_id))
            .order_by_desc(reading::Column::Timestamp)
            .one(&*self.db)
            .await?;

        Ok(model.map(Reading::from))
    }

    /// 获取设备在指定时间之前的最近一条读数
    ///
    /// 按读数时间排序而非插入顺序，乱序到达的读数也能取到正确的前驱
    pub async fn preceding(
        &self,
        device_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Reading>> {
        let model = reading::Entity::find()
            .filter(reading::Column::DeviceId.eq(device_id))
            .filter(reading::Column::Timestamp.lt(before))
            .order_by_desc(reading::Column::Timestamp)
            .one(&*self.db)
            .await?;

        Ok(model.map(Reading::from))
    }

    /// 按时间范围查询读数
    pub async fn in_range(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        let mut q = reading::Entity::find()
            .filter(reading::Column::Timestamp.gte(query.start_time))
            .filter(reading::Column::Timestamp.lte(query.end_time));

        if let Some(device_id) = &query.device_id {
            q = q.filter(reading::Column::DeviceId.eq(device_id));
        }

        q = q.order_by_asc(reading::Column::Timestamp);

        if let Some(limit) = query.limit {
            q = q.limit(limit);
        }

        let models = q.all(&*self.db).await?;
        Ok(models.into_iter().map(Reading::from).collect())
    }

    /// 统计时间范围内的温度指标
    ///
    /// # 返回
    /// 范围内无读数时返回 None
    pub async fn stats(&self, query: &ReadingQuery) -> Result<Option<ReadingStats>> {
        let readings = self.in_range(query).await?;
        if readings.is_empty() {
            return Ok(None);
        }

        let count = readings.len() as u64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for r in &readings {
            min = min.min(r.temperature);
            max = max.max(r.temperature);
            sum += r.temperature;
        }

        Ok(Some(ReadingStats {
            min_temperature: min,
            max_temperature: max,
            avg_temperature: sum / count as f64,
            count,
        }))
    }
}
