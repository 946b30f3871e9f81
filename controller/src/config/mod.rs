//! Controller 配置模块
//!
//! 加载顺序：配置文件 → 环境变量 → 命令行参数（后者覆盖前者）。

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 运行环境，生产环境下 5xx 响应不携带内部错误细节
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

/// Controller 配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Web 管理界面端口
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// 监听地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// 数据目录（数据库、日志、初始密码文件）
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// 数据库文件名（相对 data_dir）
    #[serde(default = "default_db_file")]
    pub db_file: String,

    #[serde(default)]
    pub environment: Environment,

    /// 登录会话有效期（小时）
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,

    /// 会话 cookie 是否只走 HTTPS
    #[serde(default)]
    pub cookie_secure: bool,

    /// 路由器 API 读写超时（秒）
    #[serde(default = "default_router_timeout")]
    pub router_timeout_secs: u64,

    /// 前端静态文件目录
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// 日志级别过滤，未设置时使用 RUST_LOG 或默认值
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_web_port() -> u16 {
    3000
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_db_file() -> String {
    "mikrodash.db".to_string()
}

fn default_session_ttl() -> i64 {
    24
}

fn default_router_timeout() -> u64 {
    10
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_port: default_web_port(),
            bind_address: default_bind_address(),
            data_dir: default_data_dir(),
            db_file: default_db_file(),
            environment: Environment::default(),
            session_ttl_hours: default_session_ttl(),
            cookie_secure: false,
            router_timeout_secs: default_router_timeout(),
            static_dir: default_static_dir(),
            log_level: None,
        }
    }
}

impl Config {
    /// 读取配置文件并应用环境变量覆盖
    ///
    /// 显式指定的路径必须存在；未指定时依次尝试默认位置，都没有则使用默认配置。
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
        let from_env = std::env::var("MIKRODASH_CONFIG").ok().map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => {
                let found = ["mikrodash.toml", "../mikrodash.toml"]
                    .iter()
                    .map(Path::new)
                    .find(|path| path.exists());
                match found {
                    Some(path) => Self::from_file(path)?,
                    None => Config::default(),
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(content)?)
    }

    /// 环境变量覆盖，`lookup` 便于测试注入
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("MIKRODASH_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(env) = lookup("MIKRODASH_ENV").filter(|v| !v.is_empty()) {
            self.environment = Environment::parse(&env)
                .with_context(|| format!("MIKRODASH_ENV 取值无效: {}", env))?;
        }
        if let Some(port) = lookup("MIKRODASH_PORT").filter(|v| !v.is_empty()) {
            self.web_port = port
                .parse()
                .with_context(|| format!("MIKRODASH_PORT 取值无效: {}", port))?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn web_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.web_port)
    }

    pub fn router_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.router_timeout_secs)
    }
}
