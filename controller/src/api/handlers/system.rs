use axum::extract::State;

use crate::{
    error::ApiResult,
    system_stats::{ProcessStats, SystemInfo, SystemStats},
    AppState,
};

use super::ApiResponse;

/// GET /api/system/stats
pub async fn system_stats(State(state): State<AppState>) -> ApiResult<SystemStats> {
    let stats = state.system.lock().await.stats();
    Ok(ApiResponse::success(stats))
}

/// GET /api/system/info
pub async fn system_info(State(state): State<AppState>) -> ApiResult<SystemInfo> {
    let info = state.system.lock().await.info();
    Ok(ApiResponse::success(info))
}

/// GET /api/system/process - 本进程资源占用
pub async fn process_stats(State(state): State<AppState>) -> ApiResult<ProcessStats> {
    let process = state.system.lock().await.process();
    Ok(ApiResponse::success(process))
}
