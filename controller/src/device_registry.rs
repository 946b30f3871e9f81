//! 设备登记：校验、增删改查、在线状态

use std::fmt;
use std::net::IpAddr;

use chrono::Utc;
use common::protocol::{DeviceTarget, RouterIdentity, DEFAULT_API_PORT};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    NotSet, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;

use crate::entity::{
    device, hotspot_profile, hotspot_user, pppoe_profile, pppoe_user, user_session, Device,
    HotspotProfile, HotspotUser, PppoeProfile, PppoeUser, UserSession, STATUS_OFFLINE,
    STATUS_ONLINE,
};
use crate::error::{is_unique_violation, AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// 路由器
    Mikrotik,
    Switch,
    /// 光线路终端
    Olt,
    Other,
}

impl DeviceType {
    pub const ALL: [DeviceType; 4] = [
        DeviceType::Mikrotik,
        DeviceType::Switch,
        DeviceType::Olt,
        DeviceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mikrotik => "mikrotik",
            DeviceType::Switch => "switch",
            DeviceType::Olt => "olt",
            DeviceType::Other => "other",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 新建设备请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDevice {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", alias = "deviceType", alias = "device_type")]
    pub device_type: Option<String>,
    #[serde(default, rename = "ip", alias = "ipAddress", alias = "ip_address")]
    pub ip_address: String,
    #[serde(default, rename = "port", alias = "apiPort", alias = "api_port")]
    pub api_port: Option<i32>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// 设备局部更新，`None` 表示不修改
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceChanges {
    pub name: Option<String>,
    #[serde(default, rename = "type", alias = "deviceType", alias = "device_type")]
    pub device_type: Option<String>,
    #[serde(default, rename = "ip", alias = "ipAddress", alias = "ip_address")]
    pub ip_address: Option<String>,
    #[serde(default, rename = "port", alias = "apiPort", alias = "api_port")]
    pub api_port: Option<i32>,
    pub username: Option<String>,
    /// 空字符串视为不修改
    pub password: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

pub fn validate_device_type(value: &str) -> Result<DeviceType, AppError> {
    let value = value.trim().to_ascii_lowercase();
    DeviceType::ALL
        .into_iter()
        .find(|t| t.as_str() == value)
        .ok_or_else(|| {
            let allowed: Vec<&str> = DeviceType::ALL.iter().map(DeviceType::as_str).collect();
            AppError::validation(format!(
                "Invalid device type '{}', allowed values: {}",
                value,
                allowed.join(", ")
            ))
        })
}

/// IPv4 / IPv6 地址，返回规范化后的文本
pub fn validate_ip(value: &str) -> Result<String, AppError> {
    value
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| AppError::validation(format!("Invalid IP address: {}", value.trim())))
}

fn validate_port(port: i32) -> Result<i32, AppError> {
    if (1..=65535).contains(&port) {
        Ok(port)
    } else {
        Err(AppError::validation(format!("Invalid API port: {}", port)))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// IP 已被其他设备占用时返回校验错误
async fn ensure_ip_free<C: ConnectionTrait>(
    db: &C,
    ip: &str,
    except: Option<i64>,
) -> Result<(), AppError> {
    let mut query = Device::find().filter(device::Column::IpAddress.eq(ip));
    if let Some(id) = except {
        query = query.filter(device::Column::Id.ne(id));
    }
    match query.one(db).await? {
        Some(existing) => Err(duplicate_ip(ip, &existing.name)),
        None => Ok(()),
    }
}

fn duplicate_ip(ip: &str, owner: &str) -> AppError {
    AppError::validation(format!("Device with IP {} already exists: {}", ip, owner))
}

/// 插入时撞上唯一约束（并发登记同一 IP），回查占用者给出同样的错误信息
async fn map_ip_conflict<C: ConnectionTrait>(db: &C, ip: &str, err: DbErr) -> AppError {
    if !is_unique_violation(&err) {
        return err.into();
    }
    match Device::find()
        .filter(device::Column::IpAddress.eq(ip))
        .one(db)
        .await
    {
        Ok(Some(existing)) => duplicate_ip(ip, &existing.name),
        _ => AppError::validation(format!("Device with IP {} already exists", ip)),
    }
}

pub async fn create_device(
    db: &DatabaseConnection,
    req: NewDevice,
) -> Result<device::Model, AppError> {
    let name = req.name.trim().to_string();
    let ip = req.ip_address.trim().to_string();
    let username = req.username.trim().to_string();

    let missing: Vec<&str> = [
        ("name", name.is_empty()),
        ("ip", ip.is_empty()),
        ("username", username.is_empty()),
        ("password", req.password.trim().is_empty()),
    ]
    .into_iter()
    .filter_map(|(field, empty)| empty.then_some(field))
    .collect();
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let device_type = match req.device_type.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => validate_device_type(t)?,
        _ => DeviceType::Mikrotik,
    };
    let ip = validate_ip(&ip)?;
    let api_port = validate_port(req.api_port.unwrap_or(i32::from(DEFAULT_API_PORT)))?;

    ensure_ip_free(db, &ip, None).await?;

    let now = Utc::now().naive_utc();
    let new_device = device::ActiveModel {
        id: NotSet,
        name: Set(name),
        device_type: Set(device_type.as_str().to_string()),
        ip_address: Set(ip.clone()),
        api_port: Set(api_port),
        username: Set(username),
        password: Set(req.password),
        location: Set(non_empty(req.location)),
        description: Set(non_empty(req.description)),
        status: Set(STATUS_OFFLINE.to_string()),
        last_seen: Set(None),
        router_identity: Set(None),
        router_version: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match new_device.insert(db).await {
        Ok(model) => {
            tracing::info!("📟 设备已登记: #{} {} ({})", model.id, model.name, model.ip_address);
            Ok(model)
        }
        Err(e) => Err(map_ip_conflict(db, &ip, e).await),
    }
}

pub async fn update_device(
    db: &DatabaseConnection,
    id: i64,
    changes: DeviceChanges,
) -> Result<device::Model, AppError> {
    let existing = get_device(db, id).await?;
    let mut active: device::ActiveModel = existing.clone().into();

    if let Some(name) = changes.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Device name cannot be empty"));
        }
        active.name = Set(name);
    }
    if let Some(device_type) = changes.device_type {
        active.device_type = Set(validate_device_type(&device_type)?.as_str().to_string());
    }
    let mut new_ip = None;
    if let Some(ip) = changes.ip_address {
        let ip = validate_ip(&ip)?;
        if ip != existing.ip_address {
            ensure_ip_free(db, &ip, Some(id)).await?;
            active.ip_address = Set(ip.clone());
            new_ip = Some(ip);
        }
    }
    if let Some(port) = changes.api_port {
        active.api_port = Set(validate_port(port)?);
    }
    if let Some(username) = changes.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::validation("Username cannot be empty"));
        }
        active.username = Set(username);
    }
    if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
        active.password = Set(password);
    }
    if let Some(location) = changes.location {
        active.location = Set(non_empty(Some(location)));
    }
    if let Some(description) = changes.description {
        active.description = Set(non_empty(Some(description)));
    }
    active.updated_at = Set(Utc::now().naive_utc());

    match active.update(db).await {
        Ok(model) => Ok(model),
        Err(e) => match new_ip {
            Some(ip) => Err(map_ip_conflict(db, &ip, e).await),
            None => Err(e.into()),
        },
    }
}

/// 删除设备及其全部从属数据（同一事务）
pub async fn delete_device(db: &DatabaseConnection, id: i64) -> Result<device::Model, AppError> {
    let txn = db.begin().await?;

    let existing = Device::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Device not found"))?;

    UserSession::delete_many()
        .filter(user_session::Column::DeviceId.eq(id))
        .exec(&txn)
        .await?;
    HotspotUser::delete_many()
        .filter(hotspot_user::Column::DeviceId.eq(id))
        .exec(&txn)
        .await?;
    PppoeUser::delete_many()
        .filter(pppoe_user::Column::DeviceId.eq(id))
        .exec(&txn)
        .await?;
    HotspotProfile::delete_many()
        .filter(hotspot_profile::Column::DeviceId.eq(id))
        .exec(&txn)
        .await?;
    PppoeProfile::delete_many()
        .filter(pppoe_profile::Column::DeviceId.eq(id))
        .exec(&txn)
        .await?;
    Device::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("🗑️ 设备已删除: #{} {}", existing.id, existing.name);
    Ok(existing)
}

pub async fn list_devices(db: &DatabaseConnection) -> Result<Vec<device::Model>, AppError> {
    Ok(Device::find().order_by_asc(device::Column::Id).all(db).await?)
}

pub async fn get_device(db: &DatabaseConnection, id: i64) -> Result<device::Model, AppError> {
    Device::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Device not found"))
}

/// 更新在线状态；在线时刷新 last_seen 和设备标识
pub async fn mark_status(
    db: &DatabaseConnection,
    device: device::Model,
    online: bool,
    identity: Option<&RouterIdentity>,
) -> Result<device::Model, DbErr> {
    let was_online = device.is_online();
    let (id, name) = (device.id, device.name.clone());
    let now = Utc::now().naive_utc();

    let mut active: device::ActiveModel = device.into();
    active.status = Set(if online { STATUS_ONLINE } else { STATUS_OFFLINE }.to_string());
    if online {
        active.last_seen = Set(Some(now));
    }
    if let Some(identity) = identity {
        active.router_identity = Set(Some(identity.identity.clone()));
        active.router_version = Set(Some(identity.version.clone()));
    }
    active.updated_at = Set(now);

    if was_online != online {
        if online {
            tracing::info!("设备 #{} ({}) 已上线", id, name);
        } else {
            tracing::warn!("设备 #{} ({}) 已离线", id, name);
        }
    }

    active.update(db).await
}

/// 路由器连接目标
pub fn target(device: &device::Model) -> DeviceTarget {
    let port = u16::try_from(device.api_port).unwrap_or(DEFAULT_API_PORT);
    DeviceTarget::new(
        device.ip_address.clone(),
        port,
        device.username.clone(),
        device.password.clone(),
    )
}
