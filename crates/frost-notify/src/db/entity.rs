use chrono::{DateTime as ChronoDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 值班员实体
pub mod operator {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "operators")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub name: String,
        pub email: Option<String>,
        pub telegram_chat_id: Option<String>,
        pub phone: Option<String>,
        pub priority: i32,
        pub is_active: bool,
        pub preferences: Option<Json>,
        pub created_at: ChronoDateTime<Utc>,
        pub updated_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::notification::Entity")]
        Notification,
    }

    impl Related<super::notification::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Notification.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 通知记录实体
pub mod notification {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "notifications")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub incident_id: Option<String>,
        pub alert_id: Option<String>,
        pub operator_id: String,
        pub channel: String,
        pub address: String,
        pub status: String,
        pub retry_count: i32,
        pub error: Option<String>,
        pub sent_at: Option<ChronoDateTime<Utc>>,
        pub delivered_at: Option<ChronoDateTime<Utc>>,
        pub read_at: Option<ChronoDateTime<Utc>>,
        pub created_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::operator::Entity",
            from = "Column::OperatorId",
            to = "super::operator::Column::Id"
        )]
        Operator,
    }

    impl Related<super::operator::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Operator.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
