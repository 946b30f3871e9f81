use axum::extract::{Path, State};

use crate::{
    error::ApiResult,
    report::{self, DashboardStats, MonthlyReport},
    AppState,
};

use super::ApiResponse;

/// GET /api/reports/monthly/{year}/{month}
pub async fn monthly_report(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> ApiResult<MonthlyReport> {
    let report = report::monthly_report(&state.db, year, month).await?;
    Ok(ApiResponse::success(report))
}

/// GET /api/reports/stats - 仪表盘统计
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = report::dashboard_stats(&state.db).await?;
    Ok(ApiResponse::success(stats))
}
