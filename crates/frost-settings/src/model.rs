use crate::{Result, SettingsError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 温度阈值策略
///
/// 四个边界划分出三段：正常区间、临界区间、严重区间。
/// 约束：critical_min ≤ normal_min < normal_max ≤ critical_max
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdPolicy {
    /// 正常温度下限（°C）
    pub normal_min: f64,

    /// 正常温度上限（°C）
    pub normal_max: f64,

    /// 临界温度下限（°C）
    pub critical_min: f64,

    /// 临界温度上限（°C）
    pub critical_max: f64,

    /// 上报间隔（分钟）
    pub reading_interval: i32,

    /// 告警重置时间（分钟），同类型告警在窗口内被抑制
    pub alert_reset_time: i32,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            normal_min: 2.0,
            normal_max: 8.0,
            critical_min: 0.0,
            critical_max: 10.0,
            reading_interval: 20,
            alert_reset_time: 30,
            updated_at: Utc::now(),
        }
    }
}

impl ThresholdPolicy {
    /// 校验阈值边界关系
    ///
    /// # 错误
    /// * `ValidationError` - 边界关系不成立时拒绝整次更新
    pub fn validate(&self) -> Result<()> {
        if self.normal_min >= self.normal_max {
            return Err(SettingsError::validation(format!(
                "normal_min {} must be below normal_max {}",
                self.normal_min, self.normal_max
            )));
        }
        if self.critical_min >= self.critical_max {
            return Err(SettingsError::validation(format!(
                "critical_min {} must be below critical_max {}",
                self.critical_min, self.critical_max
            )));
        }
        if self.critical_min > self.normal_min {
            return Err(SettingsError::validation(
                "critical_min must not exceed normal_min",
            ));
        }
        if self.critical_max < self.normal_max {
            return Err(SettingsError::validation(
                "critical_max must not fall below normal_max",
            ));
        }
        if self.alert_reset_time <= 0 {
            return Err(SettingsError::validation(
                "alert_reset_time must be positive",
            ));
        }
        if self.reading_interval <= 0 {
            return Err(SettingsError::validation(
                "reading_interval must be positive",
            ));
        }
        Ok(())
    }

    /// 对温度分级
    ///
    /// 正常区间两端取闭区间；临界区间外边界同样取闭区间，
    /// 恰好等于 critical_min / critical_max 的温度分级为临界而非严重
    pub fn classify(&self, temperature: f64) -> TempClass {
        if (self.normal_min..=self.normal_max).contains(&temperature) {
            TempClass::Normal
        } else if (self.critical_min..=self.critical_max).contains(&temperature) {
            TempClass::Critical
        } else {
            TempClass::Severe
        }
    }

    /// 判定越界方向
    pub fn direction(&self, temperature: f64) -> TempDirection {
        if temperature > self.normal_max {
            TempDirection::High
        } else {
            TempDirection::Low
        }
    }

    /// 告警重置窗口
    pub fn alert_reset_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.alert_reset_time as i64)
    }
}

/// 温度分级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TempClass {
    /// 正常
    Normal,
    /// 临界
    Critical,
    /// 严重
    Severe,
}

/// 越界方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TempDirection {
    /// 偏高
    High,
    /// 偏低
    Low,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(ThresholdPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let policy = ThresholdPolicy {
            normal_min: 8.0,
            normal_max: 2.0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_critical_inside_normal() {
        let policy = ThresholdPolicy {
            critical_min: 3.0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = ThresholdPolicy {
            critical_max: 7.0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_classify_boundaries() {
        let policy = ThresholdPolicy::default();

        // 正常区间为闭区间
        assert_eq!(policy.classify(2.0), TempClass::Normal);
        assert_eq!(policy.classify(8.0), TempClass::Normal);
        assert_eq!(policy.classify(5.0), TempClass::Normal);

        // 临界区间
        assert_eq!(policy.classify(1.9), TempClass::Critical);
        assert_eq!(policy.classify(9.5), TempClass::Critical);

        // 恰好等于临界边界仍为临界
        assert_eq!(policy.classify(0.0), TempClass::Critical);
        assert_eq!(policy.classify(10.0), TempClass::Critical);

        // 越过临界边界为严重
        assert_eq!(policy.classify(-0.1), TempClass::Severe);
        assert_eq!(policy.classify(10.1), TempClass::Severe);
    }

    #[test]
    fn test_direction() {
        let policy = ThresholdPolicy::default();
        assert_eq!(policy.direction(9.5), TempDirection::High);
        assert_eq!(policy.direction(1.0), TempDirection::Low);
    }
}
