use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 冷链监测设备
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// 设备 ID（全局唯一）
    pub id: String,

    /// 设备名称
    pub name: String,

    /// 安装位置（如 "冷库 A-3"）
    pub location: Option<String>,

    /// 设备状态
    pub status: DeviceStatus,

    /// 上报间隔（分钟）
    pub reporting_interval: i32,

    /// 最后一次收到读数的时间
    pub last_reading_at: Option<DateTime<Utc>>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 默认上报间隔（分钟）
pub const DEFAULT_REPORTING_INTERVAL: i32 = 20;

impl Device {
    /// 创建新设备
    pub fn new(name: String, location: Option<String>) -> Self {
        Self::with_id(format!("dev_{}", uuid::Uuid::new_v4().simple()), name, location)
    }

    /// 以指定 ID 创建设备
    ///
    /// 传感器首次上报时以上报的 device_id 落库
    pub fn with_id(id: String, name: String, location: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            location,
            status: DeviceStatus::Offline,
            reporting_interval: DEFAULT_REPORTING_INTERVAL,
            last_reading_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 记录一次读数到达
    pub fn mark_reading(&mut self, at: DateTime<Utc>) {
        self.last_reading_at = Some(at);
        self.status = DeviceStatus::Online;
        self.updated_at = Utc::now();
    }

    /// 设置状态
    pub fn set_status(&mut self, status: DeviceStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// 判断设备是否已超时失联
    ///
    /// 超过 `multiplier` 倍上报间隔未收到读数即视为失联；
    /// 从未上报过的设备不参与判断
    pub fn is_stale(&self, now: DateTime<Utc>, multiplier: u32) -> bool {
        match self.last_reading_at {
            Some(last) => {
                let allowed = chrono::Duration::minutes(self.reporting_interval as i64 * multiplier as i64);
                now.signed_duration_since(last) > allowed
            }
            None => false,
        }
    }
}

/// 设备状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    /// 在线
    Online,
    /// 离线
    Offline,
    /// 告警中
    Warning,
    /// 故障
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Warning => "warning",
            DeviceStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "online" => DeviceStatus::Online,
            "offline" => DeviceStatus::Offline,
            "warning" => DeviceStatus::Warning,
            "error" => DeviceStatus::Error,
            _ => DeviceStatus::Offline,
        }
    }
}

/// 设备过滤器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceFilter {
    /// 状态过滤
    pub status: Option<DeviceStatus>,
    /// 搜索关键词（名称/ID/位置）
    pub search: Option<String>,
    /// 分页：页码
    pub page: Option<u64>,
    /// 分页：每页数量
    pub page_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_device() {
        let device = Device::new("冷库温度计".to_string(), Some("冷库 A".to_string()));

        assert!(device.id.starts_with("dev_"));
        assert_eq!(device.name, "冷库温度计");
        assert_eq!(device.status, DeviceStatus::Offline);
        assert_eq!(device.reporting_interval, DEFAULT_REPORTING_INTERVAL);
        assert!(device.last_reading_at.is_none());
    }

    #[test]
    fn test_mark_reading() {
        let mut device = Device::with_id("sensor-01".to_string(), "sensor-01".to_string(), None);
        let now = Utc::now();

        device.mark_reading(now);
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.last_reading_at, Some(now));
    }

    #[test]
    fn test_is_stale() {
        let mut device = Device::with_id("sensor-01".to_string(), "sensor-01".to_string(), None);
        let now = Utc::now();

        // 从未上报过的设备不算失联
        assert!(!device.is_stale(now, 3));

        // 刚上报过
        device.mark_reading(now);
        assert!(!device.is_stale(now, 3));

        // 超过 3 倍上报间隔
        device.mark_reading(now - chrono::Duration::minutes(61));
        assert!(device.is_stale(now, 3));
    }

    #[test]
    fn test_status_conversion() {
        assert_eq!(DeviceStatus::Online.as_str(), "online");
        assert_eq!(DeviceStatus::from_str("warning"), DeviceStatus::Warning);
        // 未知状态回落为离线
        assert_eq!(DeviceStatus::from_str("unknown"), DeviceStatus::Offline);
    }
}
