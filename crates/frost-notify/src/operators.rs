use crate::db::operator;
use crate::{NotifyError, Operator, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 值班员名录
///
/// 维护值班员档案及其升级层级归属
pub struct OperatorDirectory {
    db: Arc<DatabaseConnection>,
}

impl OperatorDirectory {
    /// 创建新的值班员名录
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 新增值班员
    ///
    /// # 错误
    /// * `ValidationError` - 姓名为空或层级越界
    pub async fn create(&self, operator: Operator) -> Result<Operator> {
        self.validate(&operator)?;

        let active_model: operator::ActiveModel = operator.clone().into();
        operator::Entity::insert(active_model).exec(&*self.db).await?;

        info!(
            operator_id = %operator.id,
            priority = operator.priority,
            "Operator created"
        );
        Ok(operator)
    }

    /// 获取值班员
    pub async fn get(&self, operator_id: &str) -> Result<Option<Operator>> {
        let model = operator::Entity::find_by_id(operator_id.to_string())
            .one(&*self.db)
            .await?;
        Ok(model.map(Operator::from))
    }

    /// 获取值班员，不存在时报错
    pub async fn require(&self, operator_id: &str) -> Result<Operator> {
        self.get(operator_id)
            .await?
            .ok_or_else(|| NotifyError::OperatorNotFound(operator_id.to_string()))
    }

    /// 更新值班员档案
    pub async fn update(&self, operator_id: &str, mut operator: Operator) -> Result<Operator> {
        if self.get(operator_id).await?.is_none() {
            return Err(NotifyError::OperatorNotFound(operator_id.to_string()));
        }

        self.validate(&operator)?;
        operator.updated_at = Utc::now();

        let active_model: operator::ActiveModel = operator.clone().into();
        active_model.update(&*self.db).await?;

        debug!(operator_id = %operator_id, "Operator updated");
        Ok(operator)
    }

    /// 列出全部值班员（按层级和姓名排序）
    pub async fn list(&self) -> Result<Vec<Operator>> {
        let models = operator::Entity::find()
            .order_by_asc(operator::Column::Priority)
            .order_by_asc(operator::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Operator::from).collect())
    }

    /// 列出指定层级的在岗值班员
    pub async fn active_by_tier(&self, tier: i32) -> Result<Vec<Operator>> {
        let models = operator::Entity::find()
            .filter(operator::Column::IsActive.eq(true))
            .filter(operator::Column::Priority.eq(tier))
            .order_by_asc(operator::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Operator::from).collect())
    }

    /// 列出不高于指定层级的在岗值班员
    ///
    /// 供 up-to-level 通知策略使用
    pub async fn active_up_to_tier(&self, tier: i32) -> Result<Vec<Operator>> {
        let models = operator::Entity::find()
            .filter(operator::Column::IsActive.eq(true))
            .filter(operator::Column::Priority.lte(tier))
            .order_by_asc(operator::Column::Priority)
            .order_by_asc(operator::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(models.into_iter().map(Operator::from).collect())
    }

    // ========== 私有辅助方法 ==========

    fn validate(&self, operator: &Operator) -> Result<()> {
        if operator.name.is_empty() {
            return Err(NotifyError::validation("Operator name cannot be empty"));
        }
        if !(1..=3).contains(&operator.priority) {
            return Err(NotifyError::validation(format!(
                "Operator priority {} out of range [1, 3]",
                operator.priority
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Database, Statement};

    async fn create_test_directory() -> OperatorDirectory {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        db.execute(Statement::from_string(
            db.get_database_backend(),
            r#"
            CREATE TABLE IF NOT EXISTS operators (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT,
                telegram_chat_id TEXT,
                phone TEXT,
                priority INTEGER NOT NULL,
                is_active INTEGER NOT NULL,
                preferences TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#
            .to_string(),
        ))
        .await
        .unwrap();

        OperatorDirectory::new(Arc::new(db))
    }

    fn tier_operator(name: &str, tier: i32, active: bool) -> Operator {
        let mut op = Operator::new(name.to_string(), tier);
        op.is_active = active;
        op.email = Some(format!("{}@example.com", name));
        op
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let directory = create_test_directory().await;

        let op = tier_operator("zhang", 1, true);
        let id = op.id.clone();
        directory.create(op).await.unwrap();

        let found = directory.get(&id).await.unwrap().unwrap();
        assert_eq!(found.name, "zhang");
        assert!(found.preferences.email_enabled);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_tier() {
        let directory = create_test_directory().await;
        let result = directory.create(tier_operator("zhang", 4, true)).await;
        assert!(matches!(
            result.unwrap_err(),
            NotifyError::ValidationError(_)
        ));
    }

    #[tokio::test]
    async fn test_active_by_tier() {
        let directory = create_test_directory().await;

        directory.create(tier_operator("primary", 1, true)).await.unwrap();
        directory.create(tier_operator("secondary", 2, true)).await.unwrap();
        directory.create(tier_operator("off-duty", 2, false)).await.unwrap();

        let tier2 = directory.active_by_tier(2).await.unwrap();
        assert_eq!(tier2.len(), 1);
        assert_eq!(tier2[0].name, "secondary");
    }

    #[tokio::test]
    async fn test_active_up_to_tier() {
        let directory = create_test_directory().await;

        directory.create(tier_operator("primary", 1, true)).await.unwrap();
        directory.create(tier_operator("secondary", 2, true)).await.unwrap();
        directory.create(tier_operator("tertiary", 3, true)).await.unwrap();

        let ops = directory.active_up_to_tier(2).await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "primary");
    }

    #[tokio::test]
    async fn test_require_missing_operator() {
        let directory = create_test_directory().await;
        let result = directory.require("op_missing").await;
        assert!(matches!(
            result.unwrap_err(),
            NotifyError::OperatorNotFound(_)
        ));
    }
}
