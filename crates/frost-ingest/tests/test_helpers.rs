use sea_orm::{Database, DatabaseConnection, DbErr};

/// 创建测试用的 SQLite 数据库连接（完整表结构）
pub async fn create_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    setup_schema(&db).await?;
    Ok(db)
}

/// 设置数据库表结构
async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    use sea_orm::ConnectionTrait;
    use sea_orm::Statement;

    for ddl in [
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            location TEXT,
            status TEXT NOT NULL DEFAULT 'offline',
            reporting_interval INTEGER NOT NULL,
            last_reading_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            temperature REAL NOT NULL,
            humidity REAL NOT NULL,
            power_source TEXT NOT NULL,
            battery_level REAL NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS system_settings (
            id INTEGER PRIMARY KEY,
            normal_min REAL NOT NULL,
            normal_max REAL NOT NULL,
            critical_min REAL NOT NULL,
            critical_max REAL NOT NULL,
            reading_interval INTEGER NOT NULL,
            alert_reset_time INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id TEXT PRIMARY KEY,
            device_id TEXT NOT NULL,
            reading_id INTEGER,
            alert_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            message TEXT NOT NULL,
            resolved INTEGER NOT NULL,
            resolved_at TEXT,
            resolved_by TEXT,
            created_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS incidents (
            id TEXT PRIMARY KEY,
            device_id TEXT NOT NULL,
            alert_id TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            alert_count INTEGER NOT NULL,
            current_escalation_level INTEGER NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT,
            assigned_to TEXT,
            resolved_by TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS incident_timeline_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            incident_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            description TEXT NOT NULL,
            temperature REAL,
            operator_id TEXT,
            metadata TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS incident_comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            incident_id TEXT NOT NULL,
            operator_id TEXT NOT NULL,
            comment TEXT NOT NULL,
            action_taken INTEGER NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
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
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            incident_id TEXT,
            alert_id TEXT,
            operator_id TEXT NOT NULL,
            channel TEXT NOT NULL,
            address TEXT NOT NULL,
            status TEXT NOT NULL,
            retry_count INTEGER NOT NULL,
            error TEXT,
            sent_at TEXT,
            delivered_at TEXT,
            read_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            ddl.to_string(),
        ))
        .await?;
    }

    Ok(())
}
