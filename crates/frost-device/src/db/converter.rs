use crate::{Device, DeviceStatus};
use sea_orm::ActiveValue::Set;

/// Device 模型与数据库实体的转换
impl From<Device> for super::device::ActiveModel {
    fn from(device: Device) -> Self {
        Self {
            id: Set(device.id),
            name: Set(device.name),
            location: Set(device.location),
            status: Set(device.status.as_str().to_string()),
            reporting_interval: Set(device.reporting_interval),
            last_reading_at: Set(device.last_reading_at),
            created_at: Set(device.created_at),
            updated_at: Set(device.updated_at),
        }
    }
}

impl From<super::device::Model> for Device {
    fn from(model: super::device::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            location: model.location,
            status: DeviceStatus::from_str(&model.status),
            reporting_interval: model.reporting_interval,
            last_reading_at: model.last_reading_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
