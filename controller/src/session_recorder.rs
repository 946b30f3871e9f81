//! 在线会话落库
//!
//! 每次从设备读取在线会话时调用：已有的 active 行更新流量，新出现的插入，
//! 远端已经不存在的关闭。

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};
use common::protocol::ActiveSession;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter,
    Set,
};
use serde::Serialize;

use crate::entity::{user_session, UserSession, STATUS_ACTIVE, STATUS_CLOSED};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub opened: usize,
    pub updated: usize,
    pub closed: usize,
}

fn usage_bytes(session: &ActiveSession) -> i64 {
    let total = session.bytes_in.saturating_add(session.bytes_out);
    i64::try_from(total).unwrap_or(i64::MAX)
}

pub async fn record_sessions(
    db: &DatabaseConnection,
    device_id: i64,
    sessions: &[ActiveSession],
    now: NaiveDateTime,
) -> Result<RecordSummary, DbErr> {
    let mut open: HashMap<(String, String), user_session::Model> = UserSession::find()
        .filter(user_session::Column::DeviceId.eq(device_id))
        .filter(user_session::Column::Status.eq(STATUS_ACTIVE))
        .all(db)
        .await?
        .into_iter()
        .map(|row| ((row.username.clone(), row.user_type.clone()), row))
        .collect();

    let mut summary = RecordSummary::default();
    let mut seen = HashSet::new();

    for session in sessions {
        let key = (session.username.clone(), session.kind.as_str().to_string());
        if session.username.is_empty() || !seen.insert(key.clone()) {
            continue;
        }

        match open.remove(&key) {
            Some(row) => {
                let mut active: user_session::ActiveModel = row.into();
                active.data_usage_bytes = Set(usage_bytes(session));
                active.address = Set(session.address.clone());
                active.mac_address = Set(session.mac_address.clone());
                active.updated_at = Set(now);
                active.update(db).await?;
                summary.updated += 1;
            }
            None => {
                let uptime = i64::try_from(session.uptime_secs).unwrap_or(0);
                user_session::ActiveModel {
                    id: NotSet,
                    device_id: Set(device_id),
                    username: Set(key.0),
                    user_type: Set(key.1),
                    address: Set(session.address.clone()),
                    mac_address: Set(session.mac_address.clone()),
                    session_start: Set(now - Duration::seconds(uptime)),
                    session_end: Set(None),
                    data_usage_bytes: Set(usage_bytes(session)),
                    status: Set(STATUS_ACTIVE.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await?;
                summary.opened += 1;
            }
        }
    }

    // 剩下的是远端已下线的会话
    for row in open.into_values() {
        let mut active: user_session::ActiveModel = row.into();
        active.status = Set(STATUS_CLOSED.to_string());
        active.session_end = Set(Some(now));
        active.updated_at = Set(now);
        active.update(db).await?;
        summary.closed += 1;
    }

    if summary != RecordSummary::default() {
        tracing::debug!(
            "设备 #{} 会话记录: 新增 {}, 更新 {}, 关闭 {}",
            device_id,
            summary.opened,
            summary.updated,
            summary.closed
        );
    }
    Ok(summary)
}
