//! 认证中间件
//!
//! 每个受保护的请求都回库校验：会话存在且未过期、管理员存在且启用。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use crate::error::AppError;
use crate::session::{self, SESSION_COOKIE};
use crate::AppState;

/// 当前登录的管理员
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    /// 本次请求所用的会话 token
    pub session_token: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    let (_, admin) = match session::authenticate(&state.db, &token, Utc::now().naive_utc()).await? {
        Ok(found) => found,
        Err(reason) => {
            tracing::debug!("会话校验失败: {:?}", reason);
            return Err(AppError::Unauthorized(
                "Session expired or invalid".to_string(),
            ));
        }
    };

    req.extensions_mut().insert(AuthUser {
        id: admin.id,
        username: admin.username,
        session_token: token,
    });
    Ok(next.run(req).await)
}
