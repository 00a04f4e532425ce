use thiserror::Error;

/// 服务层错误类型
///
/// 各子系统错误透传，权限错误在这一层判定
#[derive(Error, Debug)]
pub enum IngestError {
    /// 设备子系统错误
    #[error(transparent)]
    Device(#[from] frost_device::DeviceError),

    /// 遥测子系统错误
    #[error(transparent)]
    Telemetry(#[from] frost_telemetry::TelemetryError),

    /// 设置子系统错误
    #[error(transparent)]
    Settings(#[from] frost_settings::SettingsError),

    /// 事件子系统错误
    #[error(transparent)]
    Incident(#[from] frost_incident::IncidentError),

    /// 通知子系统错误
    #[error(transparent)]
    Notify(#[from] frost_notify::NotifyError),

    /// 权限错误
    #[error("Authorization error: {0}")]
    AuthorizationError(String),
}

/// 服务层结果类型
pub type Result<T> = std::result::Result<T, IngestError>;
