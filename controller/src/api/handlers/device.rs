use axum::{
    extract::{Path, State},
    response::Json,
};
use common::protocol::{RouterIdentity, SystemResource};
use serde::Serialize;

use crate::{
    device_registry::{self, DeviceChanges, NewDevice},
    entity::device,
    error::{ApiResult, AppError},
    reconcile::{self, SyncKind, SyncSummary},
    AppState,
};

use super::ApiResponse;

#[derive(Serialize)]
pub struct TestConnectionResult {
    pub connected: bool,
    pub identity: Option<RouterIdentity>,
    pub error: Option<String>,
    pub device: device::Model,
}

#[derive(Serialize)]
pub struct DeviceSyncResult {
    pub device: device::Model,
    pub summaries: Vec<SyncSummary>,
}

/// GET /api/devices
pub async fn list_devices(State(state): State<AppState>) -> ApiResult<Vec<device::Model>> {
    let devices = device_registry::list_devices(&state.db).await?;
    Ok(ApiResponse::success(devices))
}

/// GET /api/devices/{id}
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<device::Model> {
    let device = device_registry::get_device(&state.db, id).await?;
    Ok(ApiResponse::success(device))
}

/// POST /api/devices
pub async fn create_device(
    State(state): State<AppState>,
    Json(req): Json<NewDevice>,
) -> ApiResult<device::Model> {
    let device = device_registry::create_device(&state.db, req).await?;
    Ok(ApiResponse::success_with_message(device, "Device created"))
}

/// PUT /api/devices/{id}
pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<DeviceChanges>,
) -> ApiResult<device::Model> {
    let device = device_registry::update_device(&state.db, id, req).await?;
    Ok(ApiResponse::success_with_message(device, "Device updated"))
}

/// DELETE /api/devices/{id} - 连同从属数据一起删除
pub async fn delete_device(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    device_registry::delete_device(&state.db, id).await?;
    state.device_locks.remove(id).await;
    Ok(ApiResponse::success_with_message((), "Device deleted"))
}

/// POST /api/devices/{id}/test - 测试连通性并刷新在线状态
///
/// 连不上不算请求失败，结果里带上错误信息。
pub async fn test_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<TestConnectionResult> {
    let device = device_registry::get_device(&state.db, id).await?;
    let target = device_registry::target(&device);

    let result = match state.router.test_connection(&target).await {
        Ok(identity) => {
            tracing::info!(
                "✅ 设备 #{} 连接成功: {} ({})",
                device.id,
                identity.identity,
                identity.version
            );
            let device = device_registry::mark_status(&state.db, device, true, Some(&identity)).await?;
            TestConnectionResult {
                connected: true,
                identity: Some(identity),
                error: None,
                device,
            }
        }
        Err(e) => {
            tracing::warn!("❌ 设备 #{} ({}) 连接失败: {}", device.id, target.address(), e);
            let device = device_registry::mark_status(&state.db, device, false, None).await?;
            TestConnectionResult {
                connected: false,
                identity: None,
                error: Some(e.to_string()),
                device,
            }
        }
    };
    Ok(ApiResponse::success(result))
}

/// GET /api/devices/{id}/info - 实时系统信息
pub async fn device_info(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<SystemResource> {
    let device = device_registry::get_device(&state.db, id).await?;
    let target = device_registry::target(&device);

    match state.router.get_system_info(&target).await {
        Ok(info) => {
            let identity = RouterIdentity {
                identity: info.identity.clone(),
                version: info.version.clone(),
                board_name: info.board_name.clone(),
            };
            device_registry::mark_status(&state.db, device, true, Some(&identity)).await?;
            Ok(ApiResponse::success(info))
        }
        Err(e) => {
            device_registry::mark_status(&state.db, device, false, None).await?;
            Err(AppError::Router(e))
        }
    }
}

/// POST /api/devices/{id}/sync - 刷新状态并同步全部四类数据
pub async fn sync_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<DeviceSyncResult> {
    let device = device_registry::get_device(&state.db, id).await?;
    let target = device_registry::target(&device);

    let identity = match state.router.test_connection(&target).await {
        Ok(identity) => identity,
        Err(e) => {
            device_registry::mark_status(&state.db, device, false, None).await?;
            return Err(AppError::Router(e));
        }
    };
    let device = device_registry::mark_status(&state.db, device, true, Some(&identity)).await?;

    let summaries = reconcile::sync_kinds(
        &state.db,
        state.router.as_ref(),
        &state.device_locks,
        &device,
        &SyncKind::ALL,
    )
    .await?;

    Ok(ApiResponse::success(DeviceSyncResult { device, summaries }))
}
