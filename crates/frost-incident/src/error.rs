use thiserror::Error;

/// 事件引擎错误类型
#[derive(Error, Debug)]
pub enum IncidentError {
    /// 事件未找到
    #[error("Incident not found: {0}")]
    NotFound(String),

    /// 告警未找到
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    /// 非法状态流转
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 通知子系统错误
    #[error("Notify error: {0}")]
    NotifyError(#[from] frost_notify::NotifyError),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 事件引擎结果类型
pub type Result<T> = std::result::Result<T, IncidentError>;

impl IncidentError {
    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        IncidentError::ValidationError(msg.into())
    }

    /// 创建状态冲突错误
    pub fn conflict(msg: impl Into<String>) -> Self {
        IncidentError::Conflict(msg.into())
    }
}
