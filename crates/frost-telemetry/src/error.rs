use thiserror::Error;

/// 遥测存储错误类型
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// 读数未找到
    #[error("Reading not found: {0}")]
    NotFound(i64),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 遥测存储结果类型
pub type Result<T> = std::result::Result<T, TelemetryError>;

impl TelemetryError {
    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        TelemetryError::ValidationError(msg.into())
    }
}
