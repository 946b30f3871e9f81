use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::prelude::*;
use std::fs::create_dir_all;
use std::time::Duration;

use crate::config::Config;

mod m20250301_000001_init;
mod m20250301_000002_create_admin_auth;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_init::Migration),
            Box::new(m20250301_000002_create_admin_auth::Migration),
        ]
    }
}

/// 打开 data_dir 下的 SQLite 数据库，文件不存在时创建
pub async fn init_sqlite(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let path = config.db_path();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let url = format!("sqlite://{}?mode=rwc", path.display());
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(8)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    tracing::info!("🗄️ 数据库: {}", path.display());
    Ok(db)
}

/// 内存数据库，已执行全部迁移
///
/// 内存库每个连接各自独立，所以连接池固定为一个连接。
#[cfg(test)]
pub async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}
