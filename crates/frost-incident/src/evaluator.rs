use crate::{AlertSeverity, AlertType};
use frost_settings::{TempClass, TempDirection, ThresholdPolicy};
use frost_telemetry::{PowerSource, Reading};
use serde::{Deserialize, Serialize};

/// 温度分级结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// 是否越限
    pub is_abnormal: bool,

    /// 分级
    pub class: TempClass,

    /// 越界方向
    pub direction: TempDirection,

    /// 对应的告警严重度
    pub severity: AlertSeverity,
}

impl ClassificationResult {
    /// 越限方向对应的告警类型
    pub fn alert_type(&self) -> AlertType {
        match self.direction {
            TempDirection::High => AlertType::HighTemperature,
            TempDirection::Low => AlertType::LowTemperature,
        }
    }
}

/// 供电状态迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerTransition {
    /// 市电 -> 电池：断电
    Failure,
    /// 电池 -> 市电：恢复
    Restored,
}

/// 一条读数的完整评估结果
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// 温度分级
    pub temperature: ClassificationResult,

    /// 供电状态迁移（与前一条读数比较得出）
    pub power: Option<PowerTransition>,

    /// 电池电量是否低于下限
    pub low_battery: bool,
}

/// 读数评估器
///
/// 纯分级计算，自身不产生副作用；
/// 设备状态更新与告警落库由摄取管线驱动
#[derive(Debug, Clone)]
pub struct ReadingEvaluator {
    /// 电池电量告警下限（%）
    low_battery_floor: f64,
}

impl ReadingEvaluator {
    /// 创建新的读数评估器
    pub fn new(low_battery_floor: f64) -> Self {
        Self { low_battery_floor }
    }

    /// 评估一条读数
    ///
    /// # 参数
    /// * `reading` - 待评估读数
    /// * `policy` - 当前阈值策略
    /// * `preceding` - 同设备按读数时间排序的前一条读数；
    ///   设备首条读数没有前驱，不产生供电迁移信号
    pub fn evaluate(
        &self,
        reading: &Reading,
        policy: &ThresholdPolicy,
        preceding: Option<&Reading>,
    ) -> Evaluation {
        let class = policy.classify(reading.temperature);
        let direction = policy.direction(reading.temperature);
        let severity = match class {
            TempClass::Normal => AlertSeverity::Info,
            TempClass::Critical => AlertSeverity::Critical,
            TempClass::Severe => AlertSeverity::Severe,
        };

        let temperature = ClassificationResult {
            is_abnormal: class != TempClass::Normal,
            class,
            direction,
            severity,
        };

        let power = preceding.and_then(|prev| {
            match (prev.power_source, reading.power_source) {
                (PowerSource::Line, PowerSource::Battery) => Some(PowerTransition::Failure),
                (PowerSource::Battery, PowerSource::Line) => Some(PowerTransition::Restored),
                _ => None,
            }
        });

        let low_battery = reading.power_source == PowerSource::Battery
            && reading.battery_level < self.low_battery_floor;

        Evaluation {
            temperature,
            power,
            low_battery,
        }
    }

    /// 温度告警描述
    pub fn temperature_message(reading: &Reading, policy: &ThresholdPolicy) -> String {
        format!(
            "Temperature {:.1}°C outside normal range [{:.1}, {:.1}]",
            reading.temperature, policy.normal_min, policy.normal_max
        )
    }
}

impl Default for ReadingEvaluator {
    fn default() -> Self {
        Self::new(crate::EscalationConfig::default().low_battery_floor)
    }
}
