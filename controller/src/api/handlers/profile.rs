use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use common::protocol::{HotspotProfileRecord, PppProfileRecord};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use crate::{
    device_registry::{self, target},
    entity::{hotspot_profile, pppoe_profile, HotspotProfile, PppoeProfile},
    error::{is_unique_violation, ApiResult, AppError},
    reconcile::{self, SyncKind, SyncSummary},
    AppState,
};

use super::{clean, ApiResponse};

#[derive(Deserialize)]
pub struct CreateHotspotProfileRequest {
    #[serde(default, alias = "deviceId")]
    pub device_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "rateLimit")]
    pub rate_limit: Option<String>,
    #[serde(alias = "sharedUsers")]
    pub shared_users: Option<i32>,
    #[serde(alias = "sessionTimeout")]
    pub session_timeout: Option<String>,
    #[serde(alias = "idleTimeout")]
    pub idle_timeout: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePppoeProfileRequest {
    #[serde(default, alias = "deviceId")]
    pub device_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "rateLimit")]
    pub rate_limit: Option<String>,
    #[serde(alias = "localAddress")]
    pub local_address: Option<String>,
    #[serde(alias = "remoteAddress")]
    pub remote_address: Option<String>,
    #[serde(alias = "dnsServer")]
    pub dns_server: Option<String>,
}

fn required(device_id: Option<i64>, name: &str) -> Result<(i64, String), AppError> {
    let name = name.trim();
    match device_id {
        Some(id) if !name.is_empty() => Ok((id, name.to_string())),
        _ => Err(AppError::validation("Device and profile name are required")),
    }
}

fn profile_exists(name: &str, device: &str) -> AppError {
    AppError::validation(format!("Profile {} already exists on device {}", name, device))
}

/// GET /api/profiles/hotspot/{deviceId}
pub async fn list_hotspot_profiles(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> ApiResult<Vec<hotspot_profile::Model>> {
    let profiles = HotspotProfile::find()
        .filter(hotspot_profile::Column::DeviceId.eq(device_id))
        .order_by_asc(hotspot_profile::Column::Name)
        .all(&state.db)
        .await?;
    Ok(ApiResponse::success(profiles))
}

/// GET /api/profiles/pppoe/{deviceId}
pub async fn list_pppoe_profiles(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> ApiResult<Vec<pppoe_profile::Model>> {
    let profiles = PppoeProfile::find()
        .filter(pppoe_profile::Column::DeviceId.eq(device_id))
        .order_by_asc(pppoe_profile::Column::Name)
        .all(&state.db)
        .await?;
    Ok(ApiResponse::success(profiles))
}

/// POST /api/profiles/hotspot - 路由器创建成功后才落库
pub async fn create_hotspot_profile(
    State(state): State<AppState>,
    Json(req): Json<CreateHotspotProfileRequest>,
) -> ApiResult<hotspot_profile::Model> {
    let (device_id, name) = required(req.device_id, &req.name)?;
    if matches!(req.shared_users, Some(n) if n < 1) {
        return Err(AppError::validation("Shared users must be at least 1"));
    }
    let device = device_registry::get_device(&state.db, device_id).await?;

    let exists = HotspotProfile::find()
        .filter(hotspot_profile::Column::DeviceId.eq(device.id))
        .filter(hotspot_profile::Column::Name.eq(&name))
        .one(&state.db)
        .await?;
    if exists.is_some() {
        return Err(profile_exists(&name, &device.name));
    }

    let record = HotspotProfileRecord {
        id: None,
        name: name.clone(),
        rate_limit: clean(req.rate_limit),
        shared_users: req.shared_users,
        session_timeout: clean(req.session_timeout),
        idle_timeout: clean(req.idle_timeout),
    };
    state
        .router
        .add_hotspot_profile(&target(&device), &record)
        .await?;

    let now = Utc::now().naive_utc();
    let profile = hotspot_profile::ActiveModel {
        id: NotSet,
        device_id: Set(device.id),
        name: Set(record.name),
        rate_limit: Set(record.rate_limit),
        shared_users: Set(record.shared_users),
        session_timeout: Set(record.session_timeout),
        idle_timeout: Set(record.idle_timeout),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match profile.insert(&state.db).await {
        Ok(profile) => {
            tracing::info!("➕ hotspot profile 已创建: {} @ {}", profile.name, device.name);
            Ok(ApiResponse::success_with_message(profile, "Profile created"))
        }
        Err(e) if is_unique_violation(&e) => Err(profile_exists(&name, &device.name)),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/profiles/pppoe - 路由器创建成功后才落库
pub async fn create_pppoe_profile(
    State(state): State<AppState>,
    Json(req): Json<CreatePppoeProfileRequest>,
) -> ApiResult<pppoe_profile::Model> {
    let (device_id, name) = required(req.device_id, &req.name)?;
    let device = device_registry::get_device(&state.db, device_id).await?;

    let exists = PppoeProfile::find()
        .filter(pppoe_profile::Column::DeviceId.eq(device.id))
        .filter(pppoe_profile::Column::Name.eq(&name))
        .one(&state.db)
        .await?;
    if exists.is_some() {
        return Err(profile_exists(&name, &device.name));
    }

    let record = PppProfileRecord {
        id: None,
        name: name.clone(),
        rate_limit: clean(req.rate_limit),
        local_address: clean(req.local_address),
        remote_address: clean(req.remote_address),
        dns_server: clean(req.dns_server),
    };
    state
        .router
        .add_pppoe_profile(&target(&device), &record)
        .await?;

    let now = Utc::now().naive_utc();
    let profile = pppoe_profile::ActiveModel {
        id: NotSet,
        device_id: Set(device.id),
        name: Set(record.name),
        rate_limit: Set(record.rate_limit),
        local_address: Set(record.local_address),
        remote_address: Set(record.remote_address),
        dns_server: Set(record.dns_server),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match profile.insert(&state.db).await {
        Ok(profile) => {
            tracing::info!("➕ PPPoE profile 已创建: {} @ {}", profile.name, device.name);
            Ok(ApiResponse::success_with_message(profile, "Profile created"))
        }
        Err(e) if is_unique_violation(&e) => Err(profile_exists(&name, &device.name)),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/profiles/sync/{deviceId} - 同步两类 profile
pub async fn sync_profiles(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> ApiResult<Vec<SyncSummary>> {
    let device = device_registry::get_device(&state.db, device_id).await?;
    let summaries = reconcile::sync_kinds(
        &state.db,
        state.router.as_ref(),
        &state.device_locks,
        &device,
        &SyncKind::PROFILES,
    )
    .await?;
    Ok(ApiResponse::success(summaries))
}
