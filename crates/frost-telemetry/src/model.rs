use crate::{Result, TelemetryError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 温度有效范围（°C）
pub const TEMPERATURE_RANGE: (f64, f64) = (-10.0, 50.0);

/// 一条遥测读数
///
/// 入库后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    /// 读数 ID
    pub id: i64,

    /// 设备 ID
    pub device_id: String,

    /// 温度（°C）
    pub temperature: f64,

    /// 湿度（%）
    pub humidity: f64,

    /// 供电来源
    pub power_source: PowerSource,

    /// 电池电量（%）
    pub battery_level: f64,

    /// 读数时间
    ///
    /// 同一设备的读数不保证按时间单调到达
    pub timestamp: DateTime<Utc>,
}

/// 待入库的读数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub power_source: PowerSource,
    pub battery_level: f64,
    /// 读数时间，缺省取服务端时间
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewReading {
    /// 校验各字段取值范围
    ///
    /// 校验失败时整条读数拒绝入库，不产生部分状态
    pub fn validate(&self) -> Result<()> {
        if self.device_id.is_empty() {
            return Err(TelemetryError::validation("Device ID cannot be empty"));
        }

        let (temp_min, temp_max) = TEMPERATURE_RANGE;
        if !(temp_min..=temp_max).contains(&self.temperature) {
            return Err(TelemetryError::validation(format!(
                "Temperature {} out of range [{}, {}]",
                self.temperature, temp_min, temp_max
            )));
        }

        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(TelemetryError::validation(format!(
                "Humidity {} out of range [0, 100]",
                self.humidity
            )));
        }

        if !(0.0..=100.0).contains(&self.battery_level) {
            return Err(TelemetryError::validation(format!(
                "Battery level {} out of range [0, 100]",
                self.battery_level
            )));
        }

        Ok(())
    }
}

/// 供电来源
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PowerSource {
    /// 市电
    Line,
    /// 电池
    Battery,
}

impl PowerSource {
    pub fn as_str(&self) -> &str {
        match self {
            PowerSource::Line => "line",
            PowerSource::Battery => "battery",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "battery" => PowerSource::Battery,
            _ => PowerSource::Line,
        }
    }
}

/// 读数查询条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingQuery {
    /// 设备 ID（None 表示全部设备）
    pub device_id: Option<String>,

    /// 开始时间
    pub start_time: DateTime<Utc>,

    /// 结束时间
    pub end_time: DateTime<Utc>,

    /// 限制返回数量
    pub limit: Option<u64>,
}

impl ReadingQuery {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            device_id: None,
            start_time,
            end_time,
            limit: None,
        }
    }

    pub fn with_device(mut self, device_id: String) -> Self {
        self.device_id = Some(device_id);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 读数聚合统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingStats {
    /// 最低温度
    pub min_temperature: f64,

    /// 最高温度
    pub max_temperature: f64,

    /// 平均温度
    pub avg_temperature: f64,

    /// 样本数量
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_reading() -> NewReading {
        NewReading {
            device_id: "coldroom-a-01".to_string(),
            temperature: 5.0,
            humidity: 45.0,
            power_source: PowerSource::Line,
            battery_level: 100.0,
            timestamp: None,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_reading().validate().is_ok());
    }

    #[test]
    fn test_validate_temperature_out_of_range() {
        let mut reading = valid_reading();
        reading.temperature = 51.0;
        assert!(reading.validate().is_err());

        reading.temperature = -10.0;
        assert!(reading.validate().is_ok());
    }

    #[test]
    fn test_validate_humidity() {
        let mut reading = valid_reading();
        reading.humidity = 100.5;
        assert!(reading.validate().is_err());
    }

    #[test]
    fn test_validate_battery_level() {
        let mut reading = valid_reading();
        reading.battery_level = -1.0;
        assert!(reading.validate().is_err());
    }

    #[test]
    fn test_power_source_conversion() {
        assert_eq!(PowerSource::Battery.as_str(), "battery");
        assert_eq!(PowerSource::from_str("line"), PowerSource::Line);
        assert_eq!(PowerSource::from_str("battery"), PowerSource::Battery);
    }
}
