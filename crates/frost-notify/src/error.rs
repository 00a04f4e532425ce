use thiserror::Error;

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotifyError {
    /// 值班员未找到
    #[error("Operator not found: {0}")]
    OperatorNotFound(String),

    /// 通知记录未找到
    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    /// 渠道投递失败
    #[error("Delivery failed: {0}")]
    DeliveryError(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 通知结果类型
pub type Result<T> = std::result::Result<T, NotifyError>;

impl NotifyError {
    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        NotifyError::ValidationError(msg.into())
    }

    /// 创建投递错误
    pub fn delivery(msg: impl Into<String>) -> Self {
        NotifyError::DeliveryError(msg.into())
    }
}
