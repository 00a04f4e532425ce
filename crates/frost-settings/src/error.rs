use thiserror::Error;

/// 系统设置错误类型
#[derive(Error, Debug)]
pub enum SettingsError {
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

/// 系统设置结果类型
pub type Result<T> = std::result::Result<T, SettingsError>;

impl SettingsError {
    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        SettingsError::ValidationError(msg.into())
    }
}
