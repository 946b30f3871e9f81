//! 报表：月度用量汇总和仪表盘统计

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
};
use serde::Serialize;

use crate::entity::{
    device, hotspot_user, pppoe_user, user_session, Device, HotspotUser, PppoeUser, UserSession,
    STATUS_ACTIVE, STATUS_ONLINE,
};
use crate::error::AppError;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// 字节 → GB，保留两位小数
pub fn bytes_to_gb(bytes: i64) -> f64 {
    (bytes as f64 / BYTES_PER_GB * 100.0).round() / 100.0
}

/// `[当月 1 日 00:00, 下月 1 日 00:00)`
pub fn month_range(year: i32, month: u32) -> Result<(NaiveDateTime, NaiveDateTime), AppError> {
    let invalid = || AppError::validation(format!("Invalid month: {}-{}", year, month));
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1).ok_or_else(invalid)?, 1)
    } else {
        (year, month + 1)
    };

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)?;
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)?;
    Ok((start, end))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserUsage {
    pub username: String,
    #[serde(rename = "sessionCount")]
    pub session_count: u64,
    #[serde(rename = "totalBytes")]
    pub total_bytes: i64,
    #[serde(rename = "totalGb")]
    pub total_gb: f64,
    #[serde(rename = "lastActive")]
    pub last_active: NaiveDateTime,
}

/// 按用户名聚合，流量降序，相同时按用户名
pub fn aggregate_sessions(rows: &[user_session::Model]) -> Vec<UserUsage> {
    let mut by_user: HashMap<&str, UserUsage> = HashMap::new();

    for row in rows {
        let active_at = row.session_end.unwrap_or(row.session_start).max(row.session_start);
        let entry = by_user.entry(row.username.as_str()).or_insert_with(|| UserUsage {
            username: row.username.clone(),
            session_count: 0,
            total_bytes: 0,
            total_gb: 0.0,
            last_active: active_at,
        });
        entry.session_count += 1;
        entry.total_bytes = entry.total_bytes.saturating_add(row.data_usage_bytes);
        entry.last_active = entry.last_active.max(active_at);
    }

    let mut users: Vec<UserUsage> = by_user
        .into_values()
        .map(|mut usage| {
            usage.total_gb = bytes_to_gb(usage.total_bytes);
            usage
        })
        .collect();
    users.sort_by(|a, b| {
        b.total_bytes
            .cmp(&a.total_bytes)
            .then_with(|| a.username.cmp(&b.username))
    });
    users
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub users: Vec<UserUsage>,
    #[serde(rename = "totalSessions")]
    pub total_sessions: u64,
    #[serde(rename = "totalBytes")]
    pub total_bytes: i64,
    #[serde(rename = "totalGb")]
    pub total_gb: f64,
}

pub async fn monthly_report(
    db: &DatabaseConnection,
    year: i32,
    month: u32,
) -> Result<MonthlyReport, AppError> {
    let (start, end) = month_range(year, month)?;
    let rows = UserSession::find()
        .filter(user_session::Column::SessionStart.gte(start))
        .filter(user_session::Column::SessionStart.lt(end))
        .all(db)
        .await?;

    let total_bytes = rows
        .iter()
        .fold(0i64, |acc, row| acc.saturating_add(row.data_usage_bytes));

    Ok(MonthlyReport {
        year,
        month,
        users: aggregate_sessions(&rows),
        total_sessions: rows.len() as u64,
        total_bytes,
        total_gb: bytes_to_gb(total_bytes),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    #[serde(rename = "totalDevices")]
    pub total_devices: u64,
    #[serde(rename = "onlineDevices")]
    pub online_devices: u64,
    #[serde(rename = "offlineDevices")]
    pub offline_devices: u64,
    #[serde(rename = "totalHotspotUsers")]
    pub total_hotspot_users: u64,
    #[serde(rename = "activeHotspotUsers")]
    pub active_hotspot_users: u64,
    #[serde(rename = "totalPppoeUsers")]
    pub total_pppoe_users: u64,
    #[serde(rename = "activePppoeUsers")]
    pub active_pppoe_users: u64,
    #[serde(rename = "activeSessions")]
    pub active_sessions: u64,
    /// 启用中的 PPPoE 用户月费合计
    #[serde(rename = "monthlyRevenue")]
    pub monthly_revenue: f64,
}

pub async fn dashboard_stats(db: &DatabaseConnection) -> Result<DashboardStats, DbErr> {
    let total_devices = Device::find().count(db).await?;
    let online_devices = Device::find()
        .filter(device::Column::Status.eq(STATUS_ONLINE))
        .count(db)
        .await?;

    let total_hotspot_users = HotspotUser::find().count(db).await?;
    let active_hotspot_users = HotspotUser::find()
        .filter(hotspot_user::Column::Status.eq(STATUS_ACTIVE))
        .count(db)
        .await?;

    let active_pppoe = PppoeUser::find()
        .filter(pppoe_user::Column::Status.eq(STATUS_ACTIVE))
        .all(db)
        .await?;
    let total_pppoe_users = PppoeUser::find().count(db).await?;
    let revenue: f64 = active_pppoe.iter().map(|u| u.monthly_cost).sum();

    let active_sessions = UserSession::find()
        .filter(user_session::Column::Status.eq(STATUS_ACTIVE))
        .count(db)
        .await?;

    Ok(DashboardStats {
        total_devices,
        online_devices,
        offline_devices: total_devices.saturating_sub(online_devices),
        total_hotspot_users,
        active_hotspot_users,
        total_pppoe_users,
        active_pppoe_users: active_pppoe.len() as u64,
        active_sessions,
        monthly_revenue: (revenue * 100.0).round() / 100.0,
    })
}
