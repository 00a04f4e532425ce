use crate::{PowerSource, Reading};
use sea_orm::ActiveValue::{NotSet, Set};

/// Reading 模型与数据库实体的转换
impl From<super::reading::Model> for Reading {
    fn from(model: super::reading::Model) -> Self {
        Self {
            id: model.id,
            device_id: model.device_id,
            temperature: model.temperature,
            humidity: model.humidity,
            power_source: PowerSource::from_str(&model.power_source),
            battery_level: model.battery_level,
            timestamp: model.timestamp,
        }
    }
}

impl From<Reading> for super::reading::ActiveModel {
    fn from(reading: Reading) -> Self {
        Self {
            id: if reading.id == 0 { NotSet } else { Set(reading.id) },
            device_id: Set(reading.device_id),
            temperature: Set(reading.temperature),
            humidity: Set(reading.humidity),
            power_source: Set(reading.power_source.as_str().to_string()),
            battery_level: Set(reading.battery_level),
            timestamp: Set(reading.timestamp),
        }
    }
}
