//! 测试辅助：种子数据和假路由器

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::protocol::{
    ActiveSession, DeviceTarget, HotspotProfileRecord, HotspotUserRecord, PppProfileRecord,
    PppSecretRecord, RouterControl, RouterIdentity, SystemResource,
};
use common::routeros::{Result, RouterOsError};
use sea_orm::{ActiveModelTrait, DatabaseConnection, NotSet, Set};

use crate::auth::hash_password;
use crate::config::Config;
use crate::entity::{
    admin_user, device, hotspot_profile, hotspot_user, pppoe_profile, pppoe_user, user_session,
};
use crate::migration::memory_db;
use crate::reconcile::DeviceLocks;
use crate::system_stats::SystemSampler;
use crate::AppState;

pub async fn seed_admin(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    is_active: bool,
) -> admin_user::Model {
    let now = Utc::now().naive_utc();
    admin_user::ActiveModel {
        id: NotSet,
        username: Set(username.to_string()),
        password_hash: Set(hash_password(password).unwrap()),
        full_name: Set(None),
        is_active: Set(is_active),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_device(db: &DatabaseConnection, name: &str, ip: &str) -> device::Model {
    let now = Utc::now().naive_utc();
    device::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        device_type: Set("mikrotik".to_string()),
        ip_address: Set(ip.to_string()),
        api_port: Set(8728),
        username: Set("admin".to_string()),
        password: Set("x".to_string()),
        location: Set(None),
        description: Set(None),
        status: Set("offline".to_string()),
        last_seen: Set(None),
        router_identity: Set(None),
        router_version: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

/// 每种从属记录各插一条
pub async fn seed_dependents(db: &DatabaseConnection, device_id: i64) {
    let now = Utc::now().naive_utc();
    hotspot_user::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        username: Set("alice".to_string()),
        password: Set("pw".to_string()),
        profile: Set(None),
        comment: Set(None),
        status: Set("active".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    seed_pppoe_user(db, device_id, "bob", 25.0, "active").await;
    hotspot_profile::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        name: Set("1M".to_string()),
        rate_limit: Set(Some("1M/1M".to_string())),
        shared_users: Set(Some(1)),
        session_timeout: Set(None),
        idle_timeout: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    pppoe_profile::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        name: Set("10M".to_string()),
        rate_limit: Set(Some("10M/10M".to_string())),
        local_address: Set(None),
        remote_address: Set(None),
        dns_server: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    seed_session(db, device_id, "alice", now, 1024).await;
}

pub async fn seed_pppoe_user(
    db: &DatabaseConnection,
    device_id: i64,
    username: &str,
    monthly_cost: f64,
    status: &str,
) -> pppoe_user::Model {
    let now = Utc::now().naive_utc();
    pppoe_user::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        username: Set(username.to_string()),
        password: Set("pw".to_string()),
        profile: Set(Some("10M".to_string())),
        service: Set("pppoe".to_string()),
        status: Set(status.to_string()),
        customer_name: Set(None),
        customer_phone: Set(None),
        customer_address: Set(None),
        ip_address: Set(None),
        monthly_cost: Set(monthly_cost),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_session(
    db: &DatabaseConnection,
    device_id: i64,
    username: &str,
    start: chrono::NaiveDateTime,
    bytes: i64,
) -> user_session::Model {
    user_session::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        username: Set(username.to_string()),
        user_type: Set("hotspot".to_string()),
        address: Set(None),
        mac_address: Set(None),
        session_start: Set(start),
        session_end: Set(Some(start + chrono::Duration::hours(1))),
        data_usage_bytes: Set(bytes),
        status: Set("closed".to_string()),
        created_at: Set(start),
        updated_at: Set(start),
    }
    .insert(db)
    .await
    .unwrap()
}

/// 假路由器的可变状态
#[derive(Default)]
pub struct FakeState {
    pub identity: String,
    pub hotspot_users: Vec<HotspotUserRecord>,
    pub pppoe_users: Vec<PppSecretRecord>,
    pub hotspot_profiles: Vec<HotspotProfileRecord>,
    pub pppoe_profiles: Vec<PppProfileRecord>,
    pub sessions: Vec<ActiveSession>,
    /// 所有调用都超时
    pub unreachable: bool,
    /// 写操作返回 !trap
    pub reject_writes: bool,
    /// 调用过的方法名
    pub calls: Vec<String>,
    /// 这些方法返回 !trap
    pub failing: Vec<&'static str>,
}

/// 内存里的 RouterControl 实现
#[derive(Clone, Default)]
pub struct FakeRouter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRouter {
    pub fn new() -> Self {
        let router = Self::default();
        router.with_state(|s| s.identity = "fake-router".to_string());
        router
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    fn enter(&self, call: &str, write: bool) -> Result<()> {
        self.with_state(|s| {
            s.calls.push(call.to_string());
            if s.unreachable {
                return Err(RouterOsError::Timeout(Duration::from_secs(10)));
            }
            if s.failing.iter().any(|f| *f == call) {
                return Err(RouterOsError::Trap {
                    message: "no such command prefix".to_string(),
                    category: None,
                });
            }
            if write && s.reject_writes {
                return Err(RouterOsError::Trap {
                    message: "failure: not permitted".to_string(),
                    category: None,
                });
            }
            Ok(())
        })
    }
}

fn duplicate() -> RouterOsError {
    RouterOsError::Trap {
        message: "failure: already have user with this name".to_string(),
        category: None,
    }
}

#[async_trait]
impl RouterControl for FakeRouter {
    async fn test_connection(&self, _target: &DeviceTarget) -> Result<RouterIdentity> {
        self.enter("test_connection", false)?;
        Ok(self.with_state(|s| RouterIdentity {
            identity: s.identity.clone(),
            version: "7.14.3 (stable)".to_string(),
            board_name: "RB4011".to_string(),
        }))
    }

    async fn get_system_info(&self, _target: &DeviceTarget) -> Result<SystemResource> {
        self.enter("get_system_info", false)?;
        Ok(self.with_state(|s| SystemResource {
            identity: s.identity.clone(),
            version: "7.14.3 (stable)".to_string(),
            board_name: "RB4011".to_string(),
            architecture: "arm".to_string(),
            cpu_load: 3,
            uptime: "1d".to_string(),
            uptime_secs: 86_400,
            free_memory: 512,
            total_memory: 1024,
            free_hdd: 64,
            total_hdd: 128,
        }))
    }

    async fn list_hotspot_users(&self, _target: &DeviceTarget) -> Result<Vec<HotspotUserRecord>> {
        self.enter("list_hotspot_users", false)?;
        Ok(self.with_state(|s| s.hotspot_users.clone()))
    }

    async fn add_hotspot_user(&self, _target: &DeviceTarget, user: &HotspotUserRecord) -> Result<()> {
        self.enter("add_hotspot_user", true)?;
        self.with_state(|s| {
            if s.hotspot_users.iter().any(|u| u.name == user.name) {
                return Err(duplicate());
            }
            s.hotspot_users.push(user.clone());
            Ok(())
        })
    }

    async fn update_hotspot_user(&self, _target: &DeviceTarget, name: &str, user: &HotspotUserRecord) -> Result<()> {
        self.enter("update_hotspot_user", true)?;
        self.with_state(|s| match s.hotspot_users.iter_mut().find(|u| u.name == name) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(RouterOsError::NotFound(format!("hotspot user {}", name))),
        })
    }

    async fn delete_hotspot_user(&self, _target: &DeviceTarget, name: &str) -> Result<bool> {
        self.enter("delete_hotspot_user", true)?;
        Ok(self.with_state(|s| {
            let before = s.hotspot_users.len();
            s.hotspot_users.retain(|u| u.name != name);
            before != s.hotspot_users.len()
        }))
    }

    async fn list_pppoe_users(&self, _target: &DeviceTarget) -> Result<Vec<PppSecretRecord>> {
        self.enter("list_pppoe_users", false)?;
        Ok(self.with_state(|s| s.pppoe_users.clone()))
    }

    async fn add_pppoe_user(&self, _target: &DeviceTarget, user: &PppSecretRecord) -> Result<()> {
        self.enter("add_pppoe_user", true)?;
        self.with_state(|s| {
            if s.pppoe_users.iter().any(|u| u.name == user.name) {
                return Err(duplicate());
            }
            s.pppoe_users.push(user.clone());
            Ok(())
        })
    }

    async fn update_pppoe_user(&self, _target: &DeviceTarget, name: &str, user: &PppSecretRecord) -> Result<()> {
        self.enter("update_pppoe_user", true)?;
        self.with_state(|s| match s.pppoe_users.iter_mut().find(|u| u.name == name) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(RouterOsError::NotFound(format!("PPP secret {}", name))),
        })
    }

    async fn delete_pppoe_user(&self, _target: &DeviceTarget, name: &str) -> Result<bool> {
        self.enter("delete_pppoe_user", true)?;
        Ok(self.with_state(|s| {
            let before = s.pppoe_users.len();
            s.pppoe_users.retain(|u| u.name != name);
            before != s.pppoe_users.len()
        }))
    }

    async fn list_hotspot_profiles(&self, _target: &DeviceTarget) -> Result<Vec<HotspotProfileRecord>> {
        self.enter("list_hotspot_profiles", false)?;
        Ok(self.with_state(|s| s.hotspot_profiles.clone()))
    }

    async fn add_hotspot_profile(&self, _target: &DeviceTarget, profile: &HotspotProfileRecord) -> Result<()> {
        self.enter("add_hotspot_profile", true)?;
        self.with_state(|s| s.hotspot_profiles.push(profile.clone()));
        Ok(())
    }

    async fn list_pppoe_profiles(&self, _target: &DeviceTarget) -> Result<Vec<PppProfileRecord>> {
        self.enter("list_pppoe_profiles", false)?;
        Ok(self.with_state(|s| s.pppoe_profiles.clone()))
    }

    async fn add_pppoe_profile(&self, _target: &DeviceTarget, profile: &PppProfileRecord) -> Result<()> {
        self.enter("add_pppoe_profile", true)?;
        self.with_state(|s| s.pppoe_profiles.push(profile.clone()));
        Ok(())
    }

    async fn list_active_sessions(&self, _target: &DeviceTarget) -> Result<Vec<ActiveSession>> {
        self.enter("list_active_sessions", false)?;
        Ok(self.with_state(|s| s.sessions.clone()))
    }
}

/// 内存库 + 假路由器组成的应用状态
pub async fn test_state(config: Config) -> (AppState, FakeRouter) {
    let router = FakeRouter::new();
    let state = AppState {
        db: memory_db().await,
        router: Arc::new(router.clone()),
        config: Arc::new(config),
        device_locks: DeviceLocks::new(),
        system: Arc::new(tokio::sync::Mutex::new(SystemSampler::new())),
    };
    (state, router)
}
