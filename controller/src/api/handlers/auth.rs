use axum::{
    extract::{Extension, State},
    response::Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{hash_password, verify_password, MIN_PASSWORD_LEN},
    entity::{admin_user, AdminUser},
    error::{ApiResult, AppError},
    middleware::AuthUser,
    session::{self, SESSION_COOKIE},
    AppState,
};

use super::ApiResponse;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: admin_user::Model,
    #[serde(rename = "expiresAt")]
    pub expires_at: chrono::NaiveDateTime,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "currentPassword")]
    pub current_password: String,
    #[serde(default, alias = "newPassword")]
    pub new_password: String,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid username or password".to_string())
}

/// POST /api/auth/login - 管理员登录
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), AppError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }

    let admin = AdminUser::find()
        .filter(admin_user::Column::Username.eq(username))
        .one(&state.db)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.password, &admin.password_hash)? {
        tracing::warn!("🔒 登录失败: {}", username);
        return Err(invalid_credentials());
    }
    if !admin.is_active {
        tracing::warn!("🔒 已停用账号尝试登录: {}", username);
        return Err(AppError::Forbidden("Account is disabled".to_string()));
    }

    let session = session::create(&state.db, admin.id, state.config.session_ttl_hours).await?;

    let mut active: admin_user::ActiveModel = admin.into();
    active.last_login = Set(Some(Utc::now().naive_utc()));
    let admin = active.update(&state.db).await?;

    tracing::info!("🔓 管理员登录: {}", admin.username);
    let jar = jar.add(session_cookie(session.token, state.config.cookie_secure));
    Ok((
        jar,
        ApiResponse::success(LoginResponse {
            user: admin,
            expires_at: session.expires_at,
        }),
    ))
}

/// POST /api/auth/logout - 注销当前会话
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<()>>), AppError> {
    session::revoke(&state.db, &auth_user.session_token).await?;
    tracing::info!("管理员注销: {}", auth_user.username);
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, ApiResponse::success_with_message((), "Logged out")))
}

/// GET /api/auth/me - 当前管理员
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<admin_user::Model> {
    let admin = AdminUser::find_by_id(auth_user.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
    Ok(ApiResponse::success(admin))
}

/// PUT /api/auth/change-password - 修改自己的密码，其他会话全部失效
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(AppError::validation(
            "Current password and new password are required",
        ));
    }
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let admin = AdminUser::find_by_id(auth_user.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    if !verify_password(&req.current_password, &admin.password_hash)? {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let mut active: admin_user::ActiveModel = admin.into();
    active.password_hash = Set(hash_password(&req.new_password)?);
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(&state.db).await?;

    let revoked =
        session::revoke_all_for_admin(&state.db, auth_user.id, Some(&auth_user.session_token))
            .await?;
    tracing::info!("🔑 {} 修改了密码，撤销其他会话 {} 个", auth_user.username, revoked);
    Ok(ApiResponse::success_with_message((), "Password changed"))
}
