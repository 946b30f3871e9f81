use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use common::protocol::PppSecretRecord;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::{
    device_registry::{self, target, validate_ip},
    entity::{pppoe_user, PppoeUser, STATUS_ACTIVE, STATUS_DISABLED},
    error::{is_unique_violation, ApiResult, AppError},
    AppState,
};

use super::{clean, hotspot::validate_status, ApiResponse, DeviceFilter};

const DEFAULT_SERVICE: &str = "pppoe";

#[derive(Deserialize)]
pub struct CreatePppoeUserRequest {
    #[serde(default, alias = "deviceId")]
    pub device_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub profile: Option<String>,
    pub service: Option<String>,
    #[serde(alias = "customerName")]
    pub customer_name: Option<String>,
    #[serde(alias = "customerPhone")]
    pub customer_phone: Option<String>,
    #[serde(alias = "customerAddress")]
    pub customer_address: Option<String>,
    #[serde(alias = "ipAddress")]
    pub ip_address: Option<String>,
    #[serde(alias = "monthlyCost")]
    pub monthly_cost: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdatePppoeUserRequest {
    pub password: Option<String>,
    pub profile: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "customerName")]
    pub customer_name: Option<String>,
    #[serde(alias = "customerPhone")]
    pub customer_phone: Option<String>,
    #[serde(alias = "customerAddress")]
    pub customer_address: Option<String>,
    #[serde(alias = "ipAddress")]
    pub ip_address: Option<String>,
    #[serde(alias = "monthlyCost")]
    pub monthly_cost: Option<f64>,
}

fn validate_cost(cost: f64) -> Result<f64, AppError> {
    if cost.is_finite() && cost >= 0.0 {
        Ok(cost)
    } else {
        Err(AppError::validation("Monthly cost must be a non-negative number"))
    }
}

/// 空串表示清除
fn optional_ip(value: Option<String>) -> Result<Option<String>, AppError> {
    clean(value).map(|ip| validate_ip(&ip)).transpose()
}

fn to_record(user: &pppoe_user::Model) -> PppSecretRecord {
    PppSecretRecord {
        id: None,
        name: user.username.clone(),
        password: user.password.clone(),
        profile: user.profile.clone(),
        service: user.service.clone(),
        remote_address: user.ip_address.clone(),
        comment: user.customer_name.clone(),
        disabled: user.status == STATUS_DISABLED,
    }
}

async fn find_user(state: &AppState, id: i64) -> Result<pppoe_user::Model, AppError> {
    PppoeUser::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("PPPoE user not found"))
}

/// GET /api/users/pppoe?device_id=
pub async fn list_pppoe_users(
    State(state): State<AppState>,
    Query(filter): Query<DeviceFilter>,
) -> ApiResult<Vec<pppoe_user::Model>> {
    let mut query = PppoeUser::find().order_by_asc(pppoe_user::Column::Id);
    if let Some(device_id) = filter.device_id {
        query = query.filter(pppoe_user::Column::DeviceId.eq(device_id));
    }
    Ok(ApiResponse::success(query.all(&state.db).await?))
}

/// GET /api/users/pppoe/{id}
pub async fn get_pppoe_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<pppoe_user::Model> {
    Ok(ApiResponse::success(find_user(&state, id).await?))
}

/// POST /api/users/pppoe - 先落库，再写路由器；路由器失败则回滚本地记录
pub async fn create_pppoe_user(
    State(state): State<AppState>,
    Json(req): Json<CreatePppoeUserRequest>,
) -> ApiResult<pppoe_user::Model> {
    let username = req.username.trim().to_string();
    let (Some(device_id), false, false) = (req.device_id, username.is_empty(), req.password.is_empty())
    else {
        return Err(AppError::validation(
            "Device, username and password are required",
        ));
    };
    let monthly_cost = validate_cost(req.monthly_cost.unwrap_or(0.0))?;
    let ip_address = optional_ip(req.ip_address)?;
    let device = device_registry::get_device(&state.db, device_id).await?;

    let now = Utc::now().naive_utc();
    let new_user = pppoe_user::ActiveModel {
        id: NotSet,
        device_id: Set(device.id),
        username: Set(username.clone()),
        password: Set(req.password),
        profile: Set(clean(req.profile)),
        service: Set(clean(req.service).unwrap_or_else(|| DEFAULT_SERVICE.to_string())),
        status: Set(STATUS_ACTIVE.to_string()),
        customer_name: Set(clean(req.customer_name)),
        customer_phone: Set(clean(req.customer_phone)),
        customer_address: Set(clean(req.customer_address)),
        ip_address: Set(ip_address),
        monthly_cost: Set(monthly_cost),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let user = match new_user.insert(&state.db).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::validation(format!(
                "PPPoE user {} already exists on device {}",
                username, device.name
            )))
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = state
        .router
        .add_pppoe_user(&target(&device), &to_record(&user))
        .await
    {
        tracing::warn!("❌ 路由器添加 PPPoE 用户 {} 失败，回滚: {}", user.username, e);
        if let Err(db_err) = user.delete(&state.db).await {
            tracing::error!("回滚 PPPoE 用户失败: {}", db_err);
        }
        return Err(AppError::Router(e));
    }

    tracing::info!("➕ PPPoE 用户已创建: {} @ {}", user.username, device.name);
    Ok(ApiResponse::success_with_message(user, "PPPoE user created"))
}

/// PUT /api/users/pppoe/{id} - 先推送到路由器，成功后才写本地
pub async fn update_pppoe_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePppoeUserRequest>,
) -> ApiResult<pppoe_user::Model> {
    let user = find_user(&state, id).await?;
    let device = device_registry::get_device(&state.db, user.device_id).await?;

    let mut updated = user.clone();
    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        updated.password = password;
    }
    if let Some(profile) = req.profile {
        updated.profile = clean(Some(profile));
    }
    if let Some(status) = req.status {
        updated.status = validate_status(&status)?;
    }
    if let Some(name) = req.customer_name {
        updated.customer_name = clean(Some(name));
    }
    if let Some(phone) = req.customer_phone {
        updated.customer_phone = clean(Some(phone));
    }
    if let Some(address) = req.customer_address {
        updated.customer_address = clean(Some(address));
    }
    if req.ip_address.is_some() {
        updated.ip_address = optional_ip(req.ip_address)?;
    }
    if let Some(cost) = req.monthly_cost {
        updated.monthly_cost = validate_cost(cost)?;
    }

    // 只有路由器侧字段变化时才需要推送
    let record = to_record(&updated);
    if record != to_record(&user) {
        state
            .router
            .update_pppoe_user(&target(&device), &user.username, &record)
            .await?;
    }

    let mut active: pppoe_user::ActiveModel = user.into();
    active.password = Set(updated.password);
    active.profile = Set(updated.profile);
    active.status = Set(updated.status);
    active.customer_name = Set(updated.customer_name);
    active.customer_phone = Set(updated.customer_phone);
    active.customer_address = Set(updated.customer_address);
    active.ip_address = Set(updated.ip_address);
    active.monthly_cost = Set(updated.monthly_cost);
    active.updated_at = Set(Utc::now().naive_utc());
    let user = active.update(&state.db).await?;

    Ok(ApiResponse::success_with_message(user, "PPPoE user updated"))
}

/// DELETE /api/users/pppoe/{id} - 路由器删除失败只记日志
pub async fn delete_pppoe_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let user = find_user(&state, id).await?;
    let device = device_registry::get_device(&state.db, user.device_id).await?;

    match state
        .router
        .delete_pppoe_user(&target(&device), &user.username)
        .await
    {
        Ok(true) => {}
        Ok(false) => tracing::info!("PPPoE 用户 {} 在路由器上已不存在", user.username),
        Err(e) => tracing::warn!(
            "⚠️ 路由器删除 PPPoE 用户 {} 失败，仅删除本地: {}",
            user.username,
            e
        ),
    }

    user.delete(&state.db).await?;
    Ok(ApiResponse::success_with_message((), "PPPoE user deleted"))
}
