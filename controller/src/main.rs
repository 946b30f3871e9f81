mod api;
mod auth;
mod config;
mod device_registry;
mod entity;
mod error;
mod middleware;
mod migration;
mod reconcile;
mod report;
mod session;
mod session_recorder;
mod system_stats;
#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use common::protocol::RouterControl;
use common::routeros::MikrotikClient;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::oneshot;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::migration::init_sqlite;
use crate::reconcile::DeviceLocks;
use crate::system_stats::SystemSampler;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub router: Arc<dyn RouterControl>,
    pub config: Arc<Config>,
    /// 同一设备的同步串行执行
    pub device_locks: DeviceLocks,
    pub system: Arc<tokio::sync::Mutex<SystemSampler>>,
}

#[derive(Parser)]
#[command(name = "mikrodash", version, about = "MikroDash - MikroTik 网络管理面板")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Web 端口，覆盖配置文件
    #[arg(long)]
    port: Option<u16>,

    /// 数据目录，覆盖配置文件
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// 过期会话清理间隔
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 读取配置，命令行参数优先
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.web_port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let _log_guard = init_logging(&config)?;

    info!("📋 MikroDash 启动 (v{})", env!("CARGO_PKG_VERSION"));
    info!("🌍 运行环境: {}", config.environment.as_str());
    info!("🌐 Web管理端口: {}", config.web_port);

    // 初始化数据库
    let db = init_sqlite(&config).await?;
    // 运行数据库迁移
    migration::Migrator::up(&db, None).await?;
    info!("✅ 数据库初始化完成");

    // 首次启动时创建 admin
    initialize_admin_user(&db, &config.data_dir).await;

    let router: Arc<dyn RouterControl> = Arc::new(MikrotikClient::new(config.router_timeout()));

    // 创建应用状态
    let app_state = AppState {
        db: db.clone(),
        router,
        config: Arc::new(config),
        device_locks: DeviceLocks::new(),
        system: Arc::new(tokio::sync::Mutex::new(SystemSampler::new())),
    };

    // 启动 Web API 服务
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let web_handle = api::start_web_server(app_state, shutdown_rx);

    // 定期清理过期会话
    start_session_purger(db.clone());

    // 等待终止信号
    info!("✅ 所有服务已启动，等待终止信号...");
    wait_for_shutdown().await;

    let _ = shutdown_tx.send(());
    if let Err(e) = web_handle.await {
        tracing::error!("Web服务任务异常退出: {}", e);
    }
    if let Err(e) = db.close().await {
        tracing::warn!("关闭数据库连接失败: {}", e);
    }
    info!("👋 服务已停止");

    Ok(())
}

/// 控制台 + 按天轮转的文件日志，返回的 guard 需要一直持有
fn init_logging(config: &Config) -> Result<WorkerGuard> {
    let env_filter = match &config.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn")),
    };

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mikrodash.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    Ok(guard)
}

async fn wait_for_shutdown() {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("监听 Ctrl+C 失败: {}", e);
            }
            info!("收到 Ctrl+C 信号，正在关闭服务...");
        }
        _ = terminate_signal() => {
            info!("收到 SIGTERM 信号，正在关闭服务...");
        }
    }
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!("监听 SIGTERM 失败: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}

/// 启动过期会话清理后台任务
fn start_session_purger(db: DatabaseConnection) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);

        loop {
            interval.tick().await;

            match session::purge_expired(&db, Utc::now().naive_utc()).await {
                Ok(0) => {}
                Ok(n) => info!("🧹 清理过期会话 {} 个", n),
                Err(e) => tracing::error!("清理过期会话失败: {}", e),
            }
        }
    });
}

/// 没有任何管理员时创建 admin，随机密码只显示一次
async fn initialize_admin_user(db: &DatabaseConnection, data_dir: &Path) {
    use crate::entity::{admin_user, AdminUser};

    match AdminUser::find().count(db).await {
        Ok(0) => {}
        Ok(_) => {
            info!("🔐 管理员账号已存在");
            return;
        }
        Err(e) => {
            tracing::error!("检查管理员账号失败: {}", e);
            return;
        }
    }

    // 生成随机密码
    let password = auth::generate_random_password(16);
    let password_hash = match auth::hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("生成管理员密码哈希失败: {}", e);
            return;
        }
    };

    let now = Utc::now().naive_utc();
    let admin = admin_user::ActiveModel {
        id: NotSet,
        username: Set("admin".to_string()),
        password_hash: Set(password_hash),
        full_name: Set(Some("Administrator".to_string())),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    if let Err(e) = admin.insert(db).await {
        tracing::error!("创建管理员账号失败: {}", e);
        return;
    }

    info!("🔐 Admin 用户已创建");
    info!("═══════════════════════════════════════════════════════════════");
    info!("👤 Admin 用户名: admin");
    info!("🔑 Admin 密码: {}", password);
    info!("⚠️  请妥善保存此密码，仅在创建时显示一次！");
    info!("═══════════════════════════════════════════════════════════════");

    let password_file = data_dir.join("admin_password.txt");
    let content = format!(
        "Admin 初始密码\n用户名: admin\n密码: {}\n⚠️ 登录后请修改密码并删除此文件！\n",
        password
    );
    match std::fs::write(&password_file, content) {
        Ok(()) => info!("📁 密码已保存到: {}", password_file.display()),
        Err(e) => tracing::error!("无法保存密码文件: {}", e),
    }
}
