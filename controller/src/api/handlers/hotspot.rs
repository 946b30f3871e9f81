use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use common::protocol::{ActiveSession, HotspotUserRecord};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::{
    device_registry::{self, target},
    entity::{hotspot_user, HotspotUser, STATUS_ACTIVE, STATUS_DISABLED},
    error::{is_unique_violation, ApiResult, AppError},
    reconcile::{self, SyncKind, SyncSummary},
    session_recorder,
    AppState,
};

use super::{clean, ApiResponse};

#[derive(Deserialize)]
pub struct DeviceFilter {
    #[serde(alias = "deviceId")]
    pub device_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateHotspotUserRequest {
    #[serde(default, alias = "deviceId")]
    pub device_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub profile: Option<String>,
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateHotspotUserRequest {
    pub password: Option<String>,
    pub profile: Option<String>,
    pub comment: Option<String>,
    pub status: Option<String>,
}

/// `active` / `disabled`
pub(crate) fn validate_status(value: &str) -> Result<String, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        s @ (STATUS_ACTIVE | STATUS_DISABLED) => Ok(s.to_string()),
        other => Err(AppError::validation(format!(
            "Invalid status '{}', allowed values: {}, {}",
            other, STATUS_ACTIVE, STATUS_DISABLED
        ))),
    }
}

fn to_record(user: &hotspot_user::Model) -> HotspotUserRecord {
    HotspotUserRecord {
        id: None,
        name: user.username.clone(),
        password: user.password.clone(),
        profile: user.profile.clone(),
        comment: user.comment.clone(),
        disabled: user.status == STATUS_DISABLED,
    }
}

async fn find_user(state: &AppState, id: i64) -> Result<hotspot_user::Model, AppError> {
    HotspotUser::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Hotspot user not found"))
}

/// GET /api/users/hotspot?device_id=
pub async fn list_hotspot_users(
    State(state): State<AppState>,
    Query(filter): Query<DeviceFilter>,
) -> ApiResult<Vec<hotspot_user::Model>> {
    let mut query = HotspotUser::find().order_by_asc(hotspot_user::Column::Id);
    if let Some(device_id) = filter.device_id {
        query = query.filter(hotspot_user::Column::DeviceId.eq(device_id));
    }
    Ok(ApiResponse::success(query.all(&state.db).await?))
}

/// GET /api/users/hotspot/{id}
pub async fn get_hotspot_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<hotspot_user::Model> {
    Ok(ApiResponse::success(find_user(&state, id).await?))
}

/// POST /api/users/hotspot - 先落库，再写路由器；路由器失败则回滚本地记录
pub async fn create_hotspot_user(
    State(state): State<AppState>,
    Json(req): Json<CreateHotspotUserRequest>,
) -> ApiResult<hotspot_user::Model> {
    let username = req.username.trim().to_string();
    let (Some(device_id), false, false) = (req.device_id, username.is_empty(), req.password.is_empty())
    else {
        return Err(AppError::validation(
            "Device, username and password are required",
        ));
    };
    let device = device_registry::get_device(&state.db, device_id).await?;

    let now = Utc::now().naive_utc();
    let new_user = hotspot_user::ActiveModel {
        id: NotSet,
        device_id: Set(device.id),
        username: Set(username.clone()),
        password: Set(req.password),
        profile: Set(clean(req.profile)),
        comment: Set(clean(req.comment)),
        status: Set(STATUS_ACTIVE.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let user = match new_user.insert(&state.db).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::validation(format!(
                "Hotspot user {} already exists on device {}",
                username, device.name
            )))
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = state
        .router
        .add_hotspot_user(&target(&device), &to_record(&user))
        .await
    {
        tracing::warn!("❌ 路由器添加 hotspot 用户 {} 失败，回滚: {}", user.username, e);
        if let Err(db_err) = user.delete(&state.db).await {
            tracing::error!("回滚 hotspot 用户失败: {}", db_err);
        }
        return Err(AppError::Router(e));
    }

    tracing::info!("➕ hotspot 用户已创建: {} @ {}", user.username, device.name);
    Ok(ApiResponse::success_with_message(user, "Hotspot user created"))
}

/// PUT /api/users/hotspot/{id} - 先推送到路由器，成功后才写本地
pub async fn update_hotspot_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateHotspotUserRequest>,
) -> ApiResult<hotspot_user::Model> {
    let user = find_user(&state, id).await?;
    let device = device_registry::get_device(&state.db, user.device_id).await?;

    let mut updated = user.clone();
    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        updated.password = password;
    }
    if let Some(profile) = req.profile {
        updated.profile = clean(Some(profile));
    }
    if let Some(comment) = req.comment {
        updated.comment = clean(Some(comment));
    }
    if let Some(status) = req.status {
        updated.status = validate_status(&status)?;
    }

    state
        .router
        .update_hotspot_user(&target(&device), &user.username, &to_record(&updated))
        .await?;

    let mut active: hotspot_user::ActiveModel = user.into();
    active.password = Set(updated.password);
    active.profile = Set(updated.profile);
    active.comment = Set(updated.comment);
    active.status = Set(updated.status);
    active.updated_at = Set(Utc::now().naive_utc());
    let user = active.update(&state.db).await?;

    Ok(ApiResponse::success_with_message(user, "Hotspot user updated"))
}

/// DELETE /api/users/hotspot/{id} - 路由器删除失败只记日志
pub async fn delete_hotspot_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let user = find_user(&state, id).await?;
    let device = device_registry::get_device(&state.db, user.device_id).await?;

    match state
        .router
        .delete_hotspot_user(&target(&device), &user.username)
        .await
    {
        Ok(true) => {}
        Ok(false) => tracing::info!("hotspot 用户 {} 在路由器上已不存在", user.username),
        Err(e) => tracing::warn!(
            "⚠️ 路由器删除 hotspot 用户 {} 失败，仅删除本地: {}",
            user.username,
            e
        ),
    }

    user.delete(&state.db).await?;
    Ok(ApiResponse::success_with_message((), "Hotspot user deleted"))
}

/// GET /api/users/sessions/{deviceId} - 实时在线会话，同时落库
pub async fn active_sessions(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> ApiResult<Vec<ActiveSession>> {
    let device = device_registry::get_device(&state.db, device_id).await?;
    let sessions = state.router.list_active_sessions(&target(&device)).await?;

    let now = Utc::now().naive_utc();
    match session_recorder::record_sessions(&state.db, device.id, &sessions, now).await {
        Ok(summary) => tracing::debug!("设备 #{} 会话记录: {:?}", device.id, summary),
        Err(e) => tracing::error!("❌ 设备 #{} 会话记录失败: {}", device.id, e),
    }

    Ok(ApiResponse::success(sessions))
}

/// POST /api/users/sync/{deviceId} - 同步 hotspot 和 PPPoE 用户
pub async fn sync_users(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> ApiResult<Vec<SyncSummary>> {
    let device = device_registry::get_device(&state.db, device_id).await?;
    let summaries = reconcile::sync_kinds(
        &state.db,
        state.router.as_ref(),
        &state.device_locks,
        &device,
        &SyncKind::USERS,
    )
    .await?;
    Ok(ApiResponse::success(summaries))
}
