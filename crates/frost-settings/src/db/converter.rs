use crate::store::SETTINGS_ROW_ID;
use crate::ThresholdPolicy;
use sea_orm::ActiveValue::Set;

/// ThresholdPolicy 与数据库实体的转换
impl From<super::system_settings::Model> for ThresholdPolicy {
    fn from(model: super::system_settings::Model) -> Self {
        Self {
            normal_min: model.normal_min,
            normal_max: model.normal_max,
            critical_min: model.critical_min,
            critical_max: model.critical_max,
            reading_interval: model.reading_interval,
            alert_reset_time: model.alert_reset_time,
            updated_at: model.updated_at,
        }
    }
}

impl From<ThresholdPolicy> for super::system_settings::ActiveModel {
    fn from(policy: ThresholdPolicy) -> Self {
        Self {
            id: Set(SETTINGS_ROW_ID),
            normal_min: Set(policy.normal_min),
            normal_max: Set(policy.normal_max),
            critical_min: Set(policy.critical_min),
            critical_max: Set(policy.critical_max),
            reading_interval: Set(policy.reading_interval),
            alert_reset_time: Set(policy.alert_reset_time),
            updated_at: Set(policy.updated_at),
        }
    }
}
