use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::AppState;

use super::ApiResponse;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub environment: &'static str,
    pub version: &'static str,
    /// 仅非生产环境返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /api/debug/health - 存活检查 + 数据库 ping
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    let production = state.config.is_production();
    let (healthy, detail) = match state.db.ping().await {
        Ok(()) => (true, None),
        Err(e) => {
            tracing::error!("❌ 健康检查: 数据库不可用: {}", e);
            (false, Some(e.to_string()))
        }
    };

    let status = HealthStatus {
        status: if healthy { "ok" } else { "degraded" },
        database: if healthy { "ok" } else { "unavailable" },
        environment: state.config.environment.as_str(),
        version: env!("CARGO_PKG_VERSION"),
        detail: if production { None } else { detail },
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, ApiResponse::success(status))
}
