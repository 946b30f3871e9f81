//! 设备 → 本地库的单向同步
//!
//! 拉取远端列表，逐条插入本地；唯一约束冲突视为已存在，其他错误记为失败并继续。
//! 不删除、不覆盖本地已有记录。同一设备的同步通过 [`DeviceLocks`] 串行执行。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use common::protocol::{
    HotspotProfileRecord, HotspotUserRecord, PppProfileRecord, PppSecretRecord, RouterControl,
};
use common::routeros::RouterOsError;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, NotSet, Set};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::device_registry::target;
use crate::entity::{
    device, hotspot_profile, hotspot_user, pppoe_profile, pppoe_user, STATUS_ACTIVE,
    STATUS_DISABLED,
};
use crate::error::is_unique_violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    HotspotUsers,
    PppoeUsers,
    HotspotProfiles,
    PppoeProfiles,
}

impl SyncKind {
    pub const USERS: [SyncKind; 2] = [SyncKind::HotspotUsers, SyncKind::PppoeUsers];
    pub const PROFILES: [SyncKind; 2] = [SyncKind::HotspotProfiles, SyncKind::PppoeProfiles];
    pub const ALL: [SyncKind; 4] = [
        SyncKind::HotspotUsers,
        SyncKind::PppoeUsers,
        SyncKind::HotspotProfiles,
        SyncKind::PppoeProfiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::HotspotUsers => "hotspot_users",
            SyncKind::PppoeUsers => "pppoe_users",
            SyncKind::HotspotProfiles => "hotspot_profiles",
            SyncKind::PppoeProfiles => "pppoe_profiles",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单条远端记录的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Inserted,
    SkippedDuplicate,
    Failed(String),
}

impl SyncOutcome {
    fn from_insert<T>(result: Result<T, DbErr>) -> Self {
        match result {
            Ok(_) => SyncOutcome::Inserted,
            Err(e) if is_unique_violation(&e) => SyncOutcome::SkippedDuplicate,
            Err(e) => SyncOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub kind: SyncKind,
    pub total: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// 远端列表拉取失败时的原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncSummary {
    fn new(kind: SyncKind) -> Self {
        Self {
            kind,
            total: 0,
            inserted: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            error: None,
        }
    }

    fn fetch_failed(kind: SyncKind, err: &RouterOsError) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::new(kind)
        }
    }

    fn record(&mut self, device_id: i64, name: &str, outcome: SyncOutcome) {
        self.total += 1;
        match outcome {
            SyncOutcome::Inserted => self.inserted += 1,
            SyncOutcome::SkippedDuplicate => self.skipped += 1,
            SyncOutcome::Failed(reason) => {
                tracing::warn!(
                    "⚠️ 同步 {} 失败: 设备 #{} 记录 '{}': {}",
                    self.kind,
                    device_id,
                    name,
                    reason
                );
                self.failed += 1;
                self.errors.push(format!("{}: {}", name, reason));
            }
        }
    }
}

/// 按设备划分的同步锁
#[derive(Clone, Default)]
pub struct DeviceLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 等待并持有该设备的锁，guard 释放即解锁
    pub async fn acquire(&self, device_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(device_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// 设备删除后丢弃对应的锁
    pub async fn remove(&self, device_id: i64) {
        self.inner.lock().await.remove(&device_id);
    }
}

/// 同步单一类型
pub async fn sync_device(
    db: &DatabaseConnection,
    router: &dyn RouterControl,
    locks: &DeviceLocks,
    device: &device::Model,
    kind: SyncKind,
) -> Result<SyncSummary, RouterOsError> {
    let _guard = locks.acquire(device.id).await;
    run_kind(db, router, device, kind).await
}

/// 在同一把锁内依次同步多个类型
///
/// 某类拉取失败时该类的 summary 带上 `error`；`!trap` 继续下一类，连接类错误直接停止。
/// 没有任何一类成功时返回第一个错误。
pub async fn sync_kinds(
    db: &DatabaseConnection,
    router: &dyn RouterControl,
    locks: &DeviceLocks,
    device: &device::Model,
    kinds: &[SyncKind],
) -> Result<Vec<SyncSummary>, RouterOsError> {
    let _guard = locks.acquire(device.id).await;
    let mut summaries = Vec::with_capacity(kinds.len());
    let mut first_error = None;
    for kind in kinds {
        match run_kind(db, router, device, *kind).await {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                tracing::warn!("⚠️ 同步 {} 拉取失败: 设备 #{}: {}", kind, device.id, e);
                summaries.push(SyncSummary::fetch_failed(*kind, &e));
                let stop = e.is_connectivity();
                first_error.get_or_insert(e);
                if stop {
                    break;
                }
            }
        }
    }

    match first_error {
        Some(e) if summaries.iter().all(|s| s.error.is_some()) => Err(e),
        _ => Ok(summaries),
    }
}

async fn run_kind(
    db: &DatabaseConnection,
    router: &dyn RouterControl,
    device: &device::Model,
    kind: SyncKind,
) -> Result<SyncSummary, RouterOsError> {
    let target = target(device);
    let mut summary = SyncSummary::new(kind);

    match kind {
        SyncKind::HotspotUsers => {
            for record in router.list_hotspot_users(&target).await? {
                let outcome = insert_hotspot_user(db, device.id, &record).await;
                summary.record(device.id, &record.name, outcome);
            }
        }
        SyncKind::PppoeUsers => {
            for record in router.list_pppoe_users(&target).await? {
                let outcome = insert_pppoe_user(db, device.id, &record).await;
                summary.record(device.id, &record.name, outcome);
            }
        }
        SyncKind::HotspotProfiles => {
            for record in router.list_hotspot_profiles(&target).await? {
                let outcome = insert_hotspot_profile(db, device.id, &record).await;
                summary.record(device.id, &record.name, outcome);
            }
        }
        SyncKind::PppoeProfiles => {
            for record in router.list_pppoe_profiles(&target).await? {
                let outcome = insert_pppoe_profile(db, device.id, &record).await;
                summary.record(device.id, &record.name, outcome);
            }
        }
    }

    tracing::info!(
        "🔄 同步完成: 设备 #{} {} 共 {} 条, 新增 {}, 已存在 {}, 失败 {}",
        device.id,
        kind,
        summary.total,
        summary.inserted,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}

fn status_of(disabled: bool) -> String {
    let status = if disabled { STATUS_DISABLED } else { STATUS_ACTIVE };
    status.to_string()
}

fn missing_name() -> SyncOutcome {
    SyncOutcome::Failed("record has no name".to_string())
}

async fn insert_hotspot_user(
    db: &DatabaseConnection,
    device_id: i64,
    record: &HotspotUserRecord,
) -> SyncOutcome {
    if record.name.is_empty() {
        return missing_name();
    }
    let now = Utc::now().naive_utc();
    let model = hotspot_user::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        username: Set(record.name.clone()),
        password: Set(record.password.clone()),
        profile: Set(record.profile.clone()),
        comment: Set(record.comment.clone()),
        status: Set(status_of(record.disabled)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    SyncOutcome::from_insert(model.insert(db).await)
}

async fn insert_pppoe_user(
    db: &DatabaseConnection,
    device_id: i64,
    record: &PppSecretRecord,
) -> SyncOutcome {
    if record.name.is_empty() {
        return missing_name();
    }
    let now = Utc::now().naive_utc();
    let model = pppoe_user::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        username: Set(record.name.clone()),
        password: Set(record.password.clone()),
        profile: Set(record.profile.clone()),
        service: Set(record.service.clone()),
        status: Set(status_of(record.disabled)),
        customer_name: Set(record.comment.clone()),
        customer_phone: Set(None),
        customer_address: Set(None),
        ip_address: Set(record.remote_address.clone()),
        monthly_cost: Set(0.0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    SyncOutcome::from_insert(model.insert(db).await)
}

async fn insert_hotspot_profile(
    db: &DatabaseConnection,
    device_id: i64,
    record: &HotspotProfileRecord,
) -> SyncOutcome {
    if record.name.is_empty() {
        return missing_name();
    }
    let now = Utc::now().naive_utc();
    let model = hotspot_profile::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        name: Set(record.name.clone()),
        rate_limit: Set(record.rate_limit.clone()),
        shared_users: Set(record.shared_users),
        session_timeout: Set(record.session_timeout.clone()),
        idle_timeout: Set(record.idle_timeout.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    SyncOutcome::from_insert(model.insert(db).await)
}

async fn insert_pppoe_profile(
    db: &DatabaseConnection,
    device_id: i64,
    record: &PppProfileRecord,
) -> SyncOutcome {
    if record.name.is_empty() {
        return missing_name();
    }
    let now = Utc::now().naive_utc();
    let model = pppoe_profile::ActiveModel {
        id: NotSet,
        device_id: Set(device_id),
        name: Set(record.name.clone()),
        rate_limit: Set(record.rate_limit.clone()),
        local_address: Set(record.local_address.clone()),
        remote_address: Set(record.remote_address.clone()),
        dns_server: Set(record.dns_server.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    SyncOutcome::from_insert(model.insert(db).await)
}
