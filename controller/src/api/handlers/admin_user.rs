use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use crate::{
    auth::{hash_password, MIN_PASSWORD_LEN},
    entity::{admin_user, AdminUser},
    error::{is_unique_violation, ApiResult, AppError},
    middleware::AuthUser,
    session,
    AppState,
};

use super::{clean, ApiResponse};

#[derive(Deserialize)]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateAdminRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
}

fn validate_username(username: &str) -> Result<String, AppError> {
    let username = username.trim();
    if username.len() < 3 || username.len() > 32 {
        return Err(AppError::validation("Username must be 3-32 characters"));
    }
    Ok(username.to_string())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn username_taken(username: &str) -> AppError {
    AppError::validation(format!("Username already exists: {}", username))
}

/// GET /api/admin/users - 管理员列表
pub async fn list_admins(State(state): State<AppState>) -> ApiResult<Vec<admin_user::Model>> {
    let admins = AdminUser::find()
        .order_by_asc(admin_user::Column::Id)
        .all(&state.db)
        .await?;
    Ok(ApiResponse::success(admins))
}

/// POST /api/admin/users - 新建管理员
pub async fn create_admin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateAdminRequest>,
) -> ApiResult<admin_user::Model> {
    let username = validate_username(&req.username)?;
    validate_password(&req.password)?;

    if AdminUser::find()
        .filter(admin_user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(username_taken(&username));
    }

    let now = Utc::now().naive_utc();
    let new_admin = admin_user::ActiveModel {
        id: NotSet,
        username: Set(username.clone()),
        password_hash: Set(hash_password(&req.password)?),
        full_name: Set(clean(req.full_name)),
        is_active: Set(req.is_active.unwrap_or(true)),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match new_admin.insert(&state.db).await {
        Ok(admin) => {
            tracing::info!("👤 {} 创建了管理员 {}", auth_user.username, admin.username);
            Ok(ApiResponse::success(admin))
        }
        Err(e) if is_unique_violation(&e) => Err(username_taken(&username)),
        Err(e) => Err(e.into()),
    }
}

/// PUT /api/admin/users/{id} - 修改管理员，不能停用自己
pub async fn update_admin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAdminRequest>,
) -> ApiResult<admin_user::Model> {
    if id == auth_user.id && req.is_active == Some(false) {
        return Err(AppError::validation("You cannot disable your own account"));
    }

    let admin = AdminUser::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Admin user not found"))?;

    let mut revoke_sessions = false;
    let mut active: admin_user::ActiveModel = admin.clone().into();

    if let Some(username) = req.username {
        let username = validate_username(&username)?;
        if username != admin.username {
            let taken = AdminUser::find()
                .filter(admin_user::Column::Username.eq(&username))
                .filter(admin_user::Column::Id.ne(id))
                .one(&state.db)
                .await?;
            if taken.is_some() {
                return Err(username_taken(&username));
            }
            active.username = Set(username);
        }
    }
    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        validate_password(&password)?;
        active.password_hash = Set(hash_password(&password)?);
        revoke_sessions = id != auth_user.id;
    }
    if let Some(full_name) = req.full_name {
        active.full_name = Set(clean(Some(full_name)));
    }
    if let Some(is_active) = req.is_active {
        active.is_active = Set(is_active);
        if !is_active {
            revoke_sessions = true;
        }
    }
    active.updated_at = Set(Utc::now().naive_utc());

    let updated = match active.update(&state.db).await {
        Ok(updated) => updated,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::validation("Username already exists"))
        }
        Err(e) => return Err(e.into()),
    };

    if revoke_sessions {
        let revoked = session::revoke_all_for_admin(&state.db, id, None).await?;
        tracing::info!("撤销管理员 {} 的会话 {} 个", updated.username, revoked);
    }
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/admin/users/{id} - 删除管理员，不能删除自己
pub async fn delete_admin(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    if id == auth_user.id {
        return Err(AppError::validation("You cannot delete your own account"));
    }

    let admin = AdminUser::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Admin user not found"))?;

    session::revoke_all_for_admin(&state.db, id, None).await?;
    AdminUser::delete_by_id(id).exec(&state.db).await?;

    tracing::info!("🗑️ {} 删除了管理员 {}", auth_user.username, admin.username);
    Ok(ApiResponse::success_with_message((), "Admin user deleted"))
}
