//! 路由器控制 trait 和相关类型

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::routeros::Result;

/// 路由器 API 默认端口
pub const DEFAULT_API_PORT: u16 = 8728;

/// 一次调用的目标设备（地址 + 管理凭据）
#[derive(Clone)]
pub struct DeviceTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl DeviceTarget {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    /// `host:port`，IPv6 地址加方括号
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Debug for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 连通性测试结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterIdentity {
    pub identity: String,
    pub version: String,
    #[serde(rename = "boardName")]
    pub board_name: String,
}

/// `/system/resource` + `/system/identity`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemResource {
    pub identity: String,
    pub version: String,
    #[serde(rename = "boardName")]
    pub board_name: String,
    pub architecture: String,
    #[serde(rename = "cpuLoad")]
    pub cpu_load: u32,
    pub uptime: String,
    #[serde(rename = "uptimeSecs")]
    pub uptime_secs: u64,
    #[serde(rename = "freeMemory")]
    pub free_memory: u64,
    #[serde(rename = "totalMemory")]
    pub total_memory: u64,
    #[serde(rename = "freeHdd")]
    pub free_hdd: u64,
    #[serde(rename = "totalHdd")]
    pub total_hdd: u64,
}

/// `/ip/hotspot/user` 记录
///
/// 新增/修改时 `id` 被忽略。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HotspotUserRecord {
    pub id: Option<String>,
    pub name: String,
    pub password: String,
    pub profile: Option<String>,
    pub comment: Option<String>,
    pub disabled: bool,
}

/// `/ppp/secret` 记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PppSecretRecord {
    pub id: Option<String>,
    pub name: String,
    pub password: String,
    pub profile: Option<String>,
    pub service: String,
    #[serde(rename = "remoteAddress")]
    pub remote_address: Option<String>,
    pub comment: Option<String>,
    pub disabled: bool,
}

/// `/ip/hotspot/user/profile` 记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HotspotProfileRecord {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "rateLimit")]
    pub rate_limit: Option<String>,
    #[serde(rename = "sharedUsers")]
    pub shared_users: Option<i32>,
    #[serde(rename = "sessionTimeout")]
    pub session_timeout: Option<String>,
    #[serde(rename = "idleTimeout")]
    pub idle_timeout: Option<String>,
}

/// `/ppp/profile` 记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PppProfileRecord {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "rateLimit")]
    pub rate_limit: Option<String>,
    #[serde(rename = "localAddress")]
    pub local_address: Option<String>,
    #[serde(rename = "remoteAddress")]
    pub remote_address: Option<String>,
    #[serde(rename = "dnsServer")]
    pub dns_server: Option<String>,
}

/// 在线会话类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Hotspot,
    Pppoe,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Hotspot => "hotspot",
            SessionKind::Pppoe => "pppoe",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 在线会话（`/ip/hotspot/active` 或 `/ppp/active`）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveSession {
    pub kind: SessionKind,
    pub username: String,
    pub address: Option<String>,
    #[serde(rename = "macAddress")]
    pub mac_address: Option<String>,
    pub uptime: String,
    #[serde(rename = "uptimeSecs")]
    pub uptime_secs: u64,
    #[serde(rename = "bytesIn")]
    pub bytes_in: u64,
    #[serde(rename = "bytesOut")]
    pub bytes_out: u64,
}

/// 路由器控制接口
///
/// 每个方法都是一次完整的连接生命周期：建立连接、登录、执行一到两条命令、关闭。
/// 失败时返回带有路由器原始信息的错误，由调用方决定是否致命。
#[async_trait]
pub trait RouterControl: Send + Sync {
    /// 测试连通性并读取设备标识
    async fn test_connection(&self, target: &DeviceTarget) -> Result<RouterIdentity>;

    /// 读取系统资源信息
    async fn get_system_info(&self, target: &DeviceTarget) -> Result<SystemResource>;

    async fn list_hotspot_users(&self, target: &DeviceTarget) -> Result<Vec<HotspotUserRecord>>;

    async fn add_hotspot_user(&self, target: &DeviceTarget, user: &HotspotUserRecord) -> Result<()>;

    /// 按用户名定位并更新；远端不存在时返回 `NotFound`
    async fn update_hotspot_user(&self, target: &DeviceTarget, name: &str, user: &HotspotUserRecord) -> Result<()>;

    /// 按用户名删除；返回远端是否真的存在该用户
    async fn delete_hotspot_user(&self, target: &DeviceTarget, name: &str) -> Result<bool>;

    async fn list_pppoe_users(&self, target: &DeviceTarget) -> Result<Vec<PppSecretRecord>>;

    async fn add_pppoe_user(&self, target: &DeviceTarget, user: &PppSecretRecord) -> Result<()>;

    async fn update_pppoe_user(&self, target: &DeviceTarget, name: &str, user: &PppSecretRecord) -> Result<()>;

    async fn delete_pppoe_user(&self, target: &DeviceTarget, name: &str) -> Result<bool>;

    async fn list_hotspot_profiles(&self, target: &DeviceTarget) -> Result<Vec<HotspotProfileRecord>>;

    async fn add_hotspot_profile(&self, target: &DeviceTarget, profile: &HotspotProfileRecord) -> Result<()>;

    async fn list_pppoe_profiles(&self, target: &DeviceTarget) -> Result<Vec<PppProfileRecord>>;

    async fn add_pppoe_profile(&self, target: &DeviceTarget, profile: &PppProfileRecord) -> Result<()>;

    /// 在线会话：先 hotspot，后 PPP
    async fn list_active_sessions(&self, target: &DeviceTarget) -> Result<Vec<ActiveSession>>;
}
