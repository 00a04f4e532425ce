use chrono::{DateTime as ChronoDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 告警实体
pub mod alert {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "alerts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub device_id: String,
        pub reading_id: Option<i64>,
        pub alert_type: String,
        pub severity: String,
        pub message: String,
        pub resolved: bool,
        pub resolved_at: Option<ChronoDateTime<Utc>>,
        pub resolved_by: Option<String>,
        pub created_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::incident::Entity")]
        Incident,
    }

    impl Related<super::incident::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Incident.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 事件实体
pub mod incident {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "incidents")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub device_id: String,
        pub alert_id: String,
        pub description: String,
        pub status: String,
        pub alert_count: i32,
        pub current_escalation_level: i32,
        pub start_time: ChronoDateTime<Utc>,
        pub end_time: Option<ChronoDateTime<Utc>>,
        pub assigned_to: Option<String>,
        pub resolved_by: Option<String>,
        pub updated_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::alert::Entity",
            from = "Column::AlertId",
            to = "super::alert::Column::Id"
        )]
        Alert,
        #[sea_orm(has_many = "super::incident_timeline_event::Entity")]
        TimelineEvent,
        #[sea_orm(has_many = "super::incident_comment::Entity")]
        Comment,
    }

    impl Related<super::alert::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Alert.def()
        }
    }

    impl Related<super::incident_timeline_event::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::TimelineEvent.def()
        }
    }

    impl Related<super::incident_comment::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Comment.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 事件时间线实体
pub mod incident_timeline_event {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "incident_timeline_events")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub incident_id: String,
        pub event_type: String,
        pub timestamp: ChronoDateTime<Utc>,
        pub description: String,
        pub temperature: Option<f64>,
        pub operator_id: Option<String>,
        pub metadata: Option<Json>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::incident::Entity",
            from = "Column::IncidentId",
            to = "super::incident::Column::Id"
        )]
        Incident,
    }

    impl Related<super::incident::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Incident.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 事件备注实体
pub mod incident_comment {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "incident_comments")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub incident_id: String,
        pub operator_id: String,
        pub comment: String,
        pub action_taken: bool,
        pub timestamp: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::incident::Entity",
            from = "Column::IncidentId",
            to = "super::incident::Column::Id"
        )]
        Incident,
    }

    impl Related<super::incident::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Incident.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
