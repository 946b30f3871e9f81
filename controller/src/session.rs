//! 服务端登录会话
//!
//! cookie 中只保存随机 token，会话有效性和管理员状态都以数据库为准。

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, NotSet, QueryFilter, Set,
};

use crate::auth::generate_random_password;
use crate::entity::{admin_user, auth_session, AdminUser, AuthSession};

pub const SESSION_COOKIE: &str = "mikrodash_sid";
const TOKEN_LEN: usize = 64;

/// 为管理员创建新会话
pub async fn create<C: ConnectionTrait>(
    db: &C,
    admin_user_id: i64,
    ttl_hours: i64,
) -> Result<auth_session::Model, DbErr> {
    let now = Utc::now().naive_utc();
    auth_session::ActiveModel {
        id: NotSet,
        token: Set(generate_random_password(TOKEN_LEN)),
        admin_user_id: Set(admin_user_id),
        expires_at: Set(now + Duration::hours(ttl_hours)),
        created_at: Set(now),
    }
    .insert(db)
    .await
}

/// 会话校验失败的原因，只用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unknown,
    Expired,
    AdminMissing,
    AdminDisabled,
}

/// 校验 token：会话存在且未过期，管理员存在且启用
///
/// 校验失败时删除该会话。
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    token: &str,
    now: NaiveDateTime,
) -> Result<Result<(auth_session::Model, admin_user::Model), Rejection>, DbErr> {
    let session = match AuthSession::find()
        .filter(auth_session::Column::Token.eq(token))
        .one(db)
        .await?
    {
        Some(session) => session,
        None => return Ok(Err(Rejection::Unknown)),
    };

    let rejection = if session.expires_at <= now {
        Some(Rejection::Expired)
    } else {
        match AdminUser::find_by_id(session.admin_user_id).one(db).await? {
            Some(admin) if admin.is_active => return Ok(Ok((session, admin))),
            Some(_) => Some(Rejection::AdminDisabled),
            None => Some(Rejection::AdminMissing),
        }
    };

    AuthSession::delete_by_id(session.id).exec(db).await?;
    Ok(Err(rejection.unwrap_or(Rejection::Unknown)))
}

pub async fn revoke<C: ConnectionTrait>(db: &C, token: &str) -> Result<u64, DbErr> {
    let result = AuthSession::delete_many()
        .filter(auth_session::Column::Token.eq(token))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// 撤销管理员的全部会话，`keep` 指定的 token 除外
pub async fn revoke_all_for_admin<C: ConnectionTrait>(
    db: &C,
    admin_user_id: i64,
    keep: Option<&str>,
) -> Result<u64, DbErr> {
    let mut query = AuthSession::delete_many()
        .filter(auth_session::Column::AdminUserId.eq(admin_user_id));
    if let Some(token) = keep {
        query = query.filter(auth_session::Column::Token.ne(token));
    }
    Ok(query.exec(db).await?.rows_affected)
}

/// 清理过期会话
pub async fn purge_expired<C: ConnectionTrait>(db: &C, now: NaiveDateTime) -> Result<u64, DbErr> {
    let result = AuthSession::delete_many()
        .filter(auth_session::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
