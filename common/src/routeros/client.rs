//! MikroTik 设备客户端
//!
//! 每次调用：TCP 连接 → 登录 → 一到两条命令 → 关闭。
//! 不做连接池、不做重试，超时统一由构造时传入的 `timeout` 控制。

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use super::connection::{run_scoped, ApiConnection, SessionFuture};
use super::error::{Result, RouterOsError};
use super::reply::{Attributes, Command};
use crate::protocol::{
    ActiveSession, DeviceTarget, HotspotProfileRecord, HotspotUserRecord, PppProfileRecord,
    PppSecretRecord, RouterControl, RouterIdentity, SessionKind, SystemResource,
};

const HOTSPOT_USER_MENU: &str = "/ip/hotspot/user";
const HOTSPOT_PROFILE_MENU: &str = "/ip/hotspot/user/profile";
const PPP_SECRET_MENU: &str = "/ppp/secret";
const PPP_PROFILE_MENU: &str = "/ppp/profile";
/// 清空 profile 时回落到设备默认套餐
const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone)]
pub struct MikrotikClient {
    timeout: Duration,
}

impl MikrotikClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect(&self, target: &DeviceTarget) -> Result<ApiConnection<TcpStream>> {
        let addr = target.address();
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| RouterOsError::Timeout(self.timeout))?
            .map_err(|source| RouterOsError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let _ = stream.set_nodelay(true);

        let mut conn = ApiConnection::new(stream, self.timeout);
        if let Err(e) = conn.login(&target.username, &target.password).await {
            conn.close().await;
            return Err(e);
        }
        debug!(device = %addr, "routeros session opened");
        Ok(conn)
    }

    /// 建立会话并执行闭包，返回前一定关闭连接
    pub async fn with_session<T, F>(&self, target: &DeviceTarget, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut ApiConnection<TcpStream>) -> SessionFuture<'c, T>,
    {
        let conn = self.connect(target).await?;
        let result = run_scoped(conn, f).await;
        debug!(device = %target.address(), ok = result.is_ok(), "routeros session closed");
        result
    }

    async fn print(&self, target: &DeviceTarget, command: Command) -> Result<Vec<Attributes>> {
        self.with_session(target, move |conn| {
            Box::pin(async move { Ok(conn.execute(&command).await?.rows) })
        })
        .await
    }

    async fn run(&self, target: &DeviceTarget, command: Command) -> Result<()> {
        self.with_session(target, move |conn| {
            Box::pin(async move {
                conn.execute(&command).await?;
                Ok(())
            })
        })
        .await
    }

    /// 按 name 查找 `.id`，再对该条目执行 `action`
    ///
    /// 返回条目是否存在。
    async fn apply_by_name(
        &self,
        target: &DeviceTarget,
        menu: &str,
        name: &str,
        action: &str,
        attrs: Vec<(&'static str, String)>,
    ) -> Result<bool> {
        let lookup = Command::new(format!("{}/print", menu))
            .attr(".proplist", ".id")
            .query("name", name);
        let path = format!("{}/{}", menu, action);

        self.with_session(target, move |conn| {
            Box::pin(async move {
                let rows = conn.execute(&lookup).await?.rows;
                let id = match rows.first().and_then(|row| row.get(".id")) {
                    Some(id) => id.clone(),
                    None => return Ok(false),
                };

                let mut command = Command::new(path).attr(".id", id);
                for (key, value) in attrs {
                    command = command.attr(key, value);
                }
                conn.execute(&command).await?;
                Ok(true)
            })
        })
        .await
    }
}

#[async_trait]
impl RouterControl for MikrotikClient {
    async fn test_connection(&self, target: &DeviceTarget) -> Result<RouterIdentity> {
        let info = self.get_system_info(target).await?;
        Ok(RouterIdentity {
            identity: info.identity,
            version: info.version,
            board_name: info.board_name,
        })
    }

    async fn get_system_info(&self, target: &DeviceTarget) -> Result<SystemResource> {
        self.with_session(target, |conn| {
            Box::pin(async move {
                let identity = conn.execute(&Command::new("/system/identity/print")).await?;
                let resource = conn.execute(&Command::new("/system/resource/print")).await?;
                let identity = identity.rows.first().cloned().unwrap_or_default();
                let resource = resource.rows.first().cloned().unwrap_or_default();
                Ok(system_resource_from_rows(&identity, &resource))
            })
        })
        .await
    }

    async fn list_hotspot_users(&self, target: &DeviceTarget) -> Result<Vec<HotspotUserRecord>> {
        let rows = self
            .print(target, Command::new(format!("{}/print", HOTSPOT_USER_MENU)))
            .await?;
        Ok(rows
            .iter()
            .filter(|row| !flag(row, "dynamic"))
            .map(hotspot_user_from_row)
            .collect())
    }

    async fn add_hotspot_user(&self, target: &DeviceTarget, user: &HotspotUserRecord) -> Result<()> {
        let mut command = Command::new(format!("{}/add", HOTSPOT_USER_MENU));
        for (key, value) in hotspot_user_attrs(user) {
            command = command.attr(key, value);
        }
        self.run(target, command).await
    }

    async fn update_hotspot_user(&self, target: &DeviceTarget, name: &str, user: &HotspotUserRecord) -> Result<()> {
        let found = self
            .apply_by_name(target, HOTSPOT_USER_MENU, name, "set", hotspot_user_set_attrs(user))
            .await?;
        if !found {
            return Err(RouterOsError::NotFound(format!("hotspot user {}", name)));
        }
        Ok(())
    }

    async fn delete_hotspot_user(&self, target: &DeviceTarget, name: &str) -> Result<bool> {
        self.apply_by_name(target, HOTSPOT_USER_MENU, name, "remove", Vec::new())
            .await
    }

    async fn list_pppoe_users(&self, target: &DeviceTarget) -> Result<Vec<PppSecretRecord>> {
        let rows = self
            .print(target, Command::new(format!("{}/print", PPP_SECRET_MENU)))
            .await?;
        Ok(rows.iter().map(ppp_secret_from_row).collect())
    }

    async fn add_pppoe_user(&self, target: &DeviceTarget, user: &PppSecretRecord) -> Result<()> {
        let mut command = Command::new(format!("{}/add", PPP_SECRET_MENU));
        for (key, value) in ppp_secret_attrs(user) {
            command = command.attr(key, value);
        }
        self.run(target, command).await
    }

    async fn update_pppoe_user(&self, target: &DeviceTarget, name: &str, user: &PppSecretRecord) -> Result<()> {
        let found = self
            .apply_by_name(target, PPP_SECRET_MENU, name, "set", ppp_secret_set_attrs(user))
            .await?;
        if !found {
            return Err(RouterOsError::NotFound(format!("PPP secret {}", name)));
        }
        Ok(())
    }

    async fn delete_pppoe_user(&self, target: &DeviceTarget, name: &str) -> Result<bool> {
        self.apply_by_name(target, PPP_SECRET_MENU, name, "remove", Vec::new())
            .await
    }

    async fn list_hotspot_profiles(&self, target: &DeviceTarget) -> Result<Vec<HotspotProfileRecord>> {
        let rows = self
            .print(target, Command::new(format!("{}/print", HOTSPOT_PROFILE_MENU)))
            .await?;
        Ok(rows.iter().map(hotspot_profile_from_row).collect())
    }

    async fn add_hotspot_profile(&self, target: &DeviceTarget, profile: &HotspotProfileRecord) -> Result<()> {
        let command = Command::new(format!("{}/add", HOTSPOT_PROFILE_MENU))
            .attr("name", &profile.name)
            .attr_opt("rate-limit", profile.rate_limit.as_deref())
            .attr_opt("shared-users", profile.shared_users.map(|n| n.to_string()))
            .attr_opt("session-timeout", profile.session_timeout.as_deref())
            .attr_opt("idle-timeout", profile.idle_timeout.as_deref());
        self.run(target, command).await
    }

    async fn list_pppoe_profiles(&self, target: &DeviceTarget) -> Result<Vec<PppProfileRecord>> {
        let rows = self
            .print(target, Command::new(format!("{}/print", PPP_PROFILE_MENU)))
            .await?;
        Ok(rows.iter().map(ppp_profile_from_row).collect())
    }

    async fn add_pppoe_profile(&self, target: &DeviceTarget, profile: &PppProfileRecord) -> Result<()> {
        let command = Command::new(format!("{}/add", PPP_PROFILE_MENU))
            .attr("name", &profile.name)
            .attr_opt("rate-limit", profile.rate_limit.as_deref())
            .attr_opt("local-address", profile.local_address.as_deref())
            .attr_opt("remote-address", profile.remote_address.as_deref())
            .attr_opt("dns-server", profile.dns_server.as_deref());
        self.run(target, command).await
    }

    async fn list_active_sessions(&self, target: &DeviceTarget) -> Result<Vec<ActiveSession>> {
        self.with_session(target, |conn| {
            Box::pin(async move {
                let hotspot = conn.execute(&Command::new("/ip/hotspot/active/print")).await?;
                let ppp = conn.execute(&Command::new("/ppp/active/print")).await?;

                let mut sessions: Vec<ActiveSession> =
                    hotspot.rows.iter().map(hotspot_active_from_row).collect();
                sessions.extend(ppp.rows.iter().map(ppp_active_from_row));
                Ok(sessions)
            })
        })
        .await
    }
}

fn text(row: &Attributes, key: &str) -> String {
    row.get(key).cloned().unwrap_or_default()
}

fn optional(row: &Attributes, key: &str) -> Option<String> {
    row.get(key).filter(|v| !v.is_empty()).cloned()
}

fn flag(row: &Attributes, key: &str) -> bool {
    matches!(row.get(key).map(String::as_str), Some("true") | Some("yes"))
}

fn number<T: FromStr + Default>(row: &Attributes, key: &str) -> T {
    row.get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

fn yes_no(value: bool) -> String {
    let value = if value { "yes" } else { "no" };
    value.to_string()
}

/// 解析 RouterOS 时长，如 `1w2d03:04:05`、`3h4m5s`、`00:05:10`
///
/// 无法识别的部分按 0 处理。
pub fn parse_uptime(value: &str) -> u64 {
    let value = value.trim();
    let (units, clock) = match value.rfind(|c: char| c.is_ascii_alphabetic()) {
        Some(idx) => value.split_at(idx + 1),
        None => ("", value),
    };

    let mut total = 0u64;
    let mut current = 0u64;
    let mut chars = units.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '0'..='9' => {
                current = current
                    .saturating_mul(10)
                    .saturating_add(u64::from(c as u8 - b'0'))
            }
            'w' => total = total.saturating_add(std::mem::take(&mut current).saturating_mul(604_800)),
            'd' => total = total.saturating_add(std::mem::take(&mut current).saturating_mul(86_400)),
            'h' => total = total.saturating_add(std::mem::take(&mut current).saturating_mul(3_600)),
            'm' if chars.peek() == Some(&'s') => {
                // 毫秒，忽略
                chars.next();
                current = 0;
            }
            'm' => total = total.saturating_add(std::mem::take(&mut current).saturating_mul(60)),
            's' => total = total.saturating_add(std::mem::take(&mut current)),
            _ => current = 0,
        }
    }

    if clock.contains(':') {
        let mut seconds = 0u64;
        for part in clock.split(':') {
            seconds = seconds
                .saturating_mul(60)
                .saturating_add(part.parse::<u64>().unwrap_or(0));
        }
        total = total.saturating_add(seconds);
    }
    total
}

fn system_resource_from_rows(identity: &Attributes, resource: &Attributes) -> SystemResource {
    let uptime = text(resource, "uptime");
    SystemResource {
        identity: text(identity, "name"),
        version: text(resource, "version"),
        board_name: text(resource, "board-name"),
        architecture: text(resource, "architecture-name"),
        cpu_load: number(resource, "cpu-load"),
        uptime_secs: parse_uptime(&uptime),
        uptime,
        free_memory: number(resource, "free-memory"),
        total_memory: number(resource, "total-memory"),
        free_hdd: number(resource, "free-hdd-space"),
        total_hdd: number(resource, "total-hdd-space"),
    }
}

fn hotspot_user_from_row(row: &Attributes) -> HotspotUserRecord {
    HotspotUserRecord {
        id: optional(row, ".id"),
        name: text(row, "name"),
        password: text(row, "password"),
        profile: optional(row, "profile"),
        comment: optional(row, "comment"),
        disabled: flag(row, "disabled"),
    }
}

fn hotspot_user_attrs(user: &HotspotUserRecord) -> Vec<(&'static str, String)> {
    let mut attrs = vec![("name", user.name.clone()), ("password", user.password.clone())];
    if let Some(profile) = &user.profile {
        attrs.push(("profile", profile.clone()));
    }
    if let Some(comment) = &user.comment {
        attrs.push(("comment", comment.clone()));
    }
    attrs.push(("disabled", yes_no(user.disabled)));
    attrs
}

/// `set` 必须带上全部字段，`None` 写成空值以清除设备上的旧值
fn hotspot_user_set_attrs(user: &HotspotUserRecord) -> Vec<(&'static str, String)> {
    vec![
        ("name", user.name.clone()),
        ("password", user.password.clone()),
        ("profile", profile_or_default(&user.profile)),
        ("comment", user.comment.clone().unwrap_or_default()),
        ("disabled", yes_no(user.disabled)),
    ]
}

fn profile_or_default(profile: &Option<String>) -> String {
    profile
        .clone()
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

fn ppp_secret_from_row(row: &Attributes) -> PppSecretRecord {
    PppSecretRecord {
        id: optional(row, ".id"),
        name: text(row, "name"),
        password: text(row, "password"),
        profile: optional(row, "profile"),
        service: optional(row, "service").unwrap_or_else(|| "any".to_string()),
        remote_address: optional(row, "remote-address"),
        comment: optional(row, "comment"),
        disabled: flag(row, "disabled"),
    }
}

fn ppp_secret_attrs(user: &PppSecretRecord) -> Vec<(&'static str, String)> {
    let mut attrs = vec![
        ("name", user.name.clone()),
        ("password", user.password.clone()),
        ("service", user.service.clone()),
    ];
    if let Some(profile) = &user.profile {
        attrs.push(("profile", profile.clone()));
    }
    if let Some(remote_address) = &user.remote_address {
        attrs.push(("remote-address", remote_address.clone()));
    }
    if let Some(comment) = &user.comment {
        attrs.push(("comment", comment.clone()));
    }
    attrs.push(("disabled", yes_no(user.disabled)));
    attrs
}

fn ppp_secret_set_attrs(user: &PppSecretRecord) -> Vec<(&'static str, String)> {
    vec![
        ("name", user.name.clone()),
        ("password", user.password.clone()),
        ("service", user.service.clone()),
        ("profile", profile_or_default(&user.profile)),
        ("remote-address", user.remote_address.clone().unwrap_or_default()),
        ("comment", user.comment.clone().unwrap_or_default()),
        ("disabled", yes_no(user.disabled)),
    ]
}

fn hotspot_profile_from_row(row: &Attributes) -> HotspotProfileRecord {
    HotspotProfileRecord {
        id: optional(row, ".id"),
        name: text(row, "name"),
        rate_limit: optional(row, "rate-limit"),
        shared_users: row.get("shared-users").and_then(|v| v.parse().ok()),
        session_timeout: optional(row, "session-timeout"),
        idle_timeout: optional(row, "idle-timeout"),
    }
}

fn ppp_profile_from_row(row: &Attributes) -> PppProfileRecord {
    PppProfileRecord {
        id: optional(row, ".id"),
        name: text(row, "name"),
        rate_limit: optional(row, "rate-limit"),
        local_address: optional(row, "local-address"),
        remote_address: optional(row, "remote-address"),
        dns_server: optional(row, "dns-server"),
    }
}

fn hotspot_active_from_row(row: &Attributes) -> ActiveSession {
    let uptime = text(row, "uptime");
    ActiveSession {
        kind: SessionKind::Hotspot,
        username: text(row, "user"),
        address: optional(row, "address"),
        mac_address: optional(row, "mac-address"),
        uptime_secs: parse_uptime(&uptime),
        uptime,
        bytes_in: number(row, "bytes-in"),
        bytes_out: number(row, "bytes-out"),
    }
}

fn ppp_active_from_row(row: &Attributes) -> ActiveSession {
    let uptime = text(row, "uptime");
    ActiveSession {
        kind: SessionKind::Pppoe,
        username: text(row, "name"),
        address: optional(row, "address"),
        mac_address: optional(row, "caller-id"),
        uptime_secs: parse_uptime(&uptime),
        uptime,
        bytes_in: 0,
        bytes_out: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routeros::connection::fake::fake_router;
    use tokio::net::TcpListener;

    fn row(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// 本地监听一个端口，由假路由器按脚本应答
    async fn spawn_router(
        script: Vec<Vec<Vec<&'static str>>>,
    ) -> (DeviceTarget, tokio::task::JoinHandle<Vec<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            fake_router(stream, script).await
        });
        (DeviceTarget::new("127.0.0.1", port, "admin", "x"), handle)
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("1w2d03:04:05"), 604_800 + 172_800 + 3 * 3600 + 4 * 60 + 5);
        assert_eq!(parse_uptime("3h4m5s"), 11_045);
        assert_eq!(parse_uptime("00:05:10"), 310);
        assert_eq!(parse_uptime("2d"), 172_800);
        assert_eq!(parse_uptime("1m500ms"), 60);
        assert_eq!(parse_uptime(""), 0);
        // 超长数字不溢出
        assert_eq!(parse_uptime("99999999999999999999999w"), u64::MAX);
        assert_eq!(parse_uptime("9999999999999999999:00:00"), u64::MAX);
    }

    #[test]
    fn test_hotspot_user_from_row() {
        let user = hotspot_user_from_row(&row(&[
            (".id", "*3"),
            ("name", "alice"),
            ("password", "pw"),
            ("profile", "1M"),
            ("comment", ""),
            ("disabled", "true"),
        ]));
        assert_eq!(user.id.as_deref(), Some("*3"));
        assert_eq!(user.profile.as_deref(), Some("1M"));
        assert_eq!(user.comment, None);
        assert!(user.disabled);
    }

    #[test]
    fn test_ppp_secret_attrs() {
        let attrs = ppp_secret_attrs(&PppSecretRecord {
            id: Some("*9".to_string()),
            name: "bob".to_string(),
            password: "pw".to_string(),
            profile: Some("10M".to_string()),
            service: "pppoe".to_string(),
            remote_address: Some("10.10.0.5".to_string()),
            comment: None,
            disabled: false,
        });
        assert!(attrs.contains(&("remote-address", "10.10.0.5".to_string())));
        assert!(attrs.contains(&("disabled", "no".to_string())));
        assert!(!attrs.iter().any(|(k, _)| *k == ".id"));
    }

    #[test]
    fn test_active_sessions_from_rows() {
        let hotspot = hotspot_active_from_row(&row(&[
            ("user", "alice"),
            ("address", "10.5.50.2"),
            ("mac-address", "AA:BB:CC:DD:EE:FF"),
            ("uptime", "1h2m3s"),
            ("bytes-in", "1024"),
            ("bytes-out", "2048"),
        ]));
        assert_eq!(hotspot.kind, SessionKind::Hotspot);
        assert_eq!(hotspot.uptime_secs, 3723);
        assert_eq!(hotspot.bytes_out, 2048);

        let ppp = ppp_active_from_row(&row(&[("name", "bob"), ("caller-id", "11:22:33:44:55:66")]));
        assert_eq!(ppp.kind, SessionKind::Pppoe);
        assert_eq!(ppp.mac_address.as_deref(), Some("11:22:33:44:55:66"));
        assert_eq!(ppp.bytes_in, 0);
    }

    #[tokio::test]
    async fn test_system_info_over_tcp() {
        let (target, router) = spawn_router(vec![
            vec![vec!["!done"]],
            vec![vec!["!re", "=name=core-router"], vec!["!done"]],
            vec![
                vec![
                    "!re",
                    "=version=7.14.3 (stable)",
                    "=board-name=RB4011",
                    "=cpu-load=7",
                    "=uptime=2d04:00:00",
                    "=free-memory=800000000",
                    "=total-memory=1073741824",
                ],
                vec!["!done"],
            ],
        ])
        .await;

        let client = MikrotikClient::new(Duration::from_secs(5));
        let info = client.get_system_info(&target).await.unwrap();
        assert_eq!(info.identity, "core-router");
        assert_eq!(info.board_name, "RB4011");
        assert_eq!(info.cpu_load, 7);
        assert_eq!(info.uptime_secs, 2 * 86_400 + 4 * 3600);

        let received = router.await.unwrap();
        assert_eq!(received.last().unwrap(), &vec!["/quit".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_looks_up_id_first() {
        let (target, router) = spawn_router(vec![
            vec![vec!["!done"]],
            vec![vec!["!re", "=.id=*1F"], vec!["!done"]],
            vec![vec!["!done"]],
        ])
        .await;

        let client = MikrotikClient::new(Duration::from_secs(5));
        let removed = client.delete_hotspot_user(&target, "alice").await.unwrap();
        assert!(removed);

        let received = router.await.unwrap();
        assert_eq!(
            received[1],
            vec!["/ip/hotspot/user/print", "=.proplist=.id", "?name=alice"]
        );
        assert_eq!(received[2], vec!["/ip/hotspot/user/remove", "=.id=*1F"]);
        assert_eq!(received[3], vec!["/quit"]);
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let (target, router) =
            spawn_router(vec![vec![vec!["!done"]], vec![vec!["!done"]]]).await;

        let client = MikrotikClient::new(Duration::from_secs(5));
        let err = client
            .update_pppoe_user(&target, "ghost", &PppSecretRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RouterOsError::NotFound(_)));

        // 查不到就不发 set
        let received = router.await.unwrap();
        assert_eq!(received.len(), 3);
        assert_eq!(received[2], vec!["/quit"]);
    }

    #[tokio::test]
    async fn test_update_clears_optional_fields() {
        let (target, router) = spawn_router(vec![
            vec![vec!["!done"]],
            vec![vec!["!re", "=.id=*5"], vec!["!done"]],
            vec![vec!["!done"]],
        ])
        .await;

        let client = MikrotikClient::new(Duration::from_secs(5));
        let user = PppSecretRecord {
            name: "bob".to_string(),
            password: "pw".to_string(),
            service: "pppoe".to_string(),
            ..Default::default()
        };
        client.update_pppoe_user(&target, "bob", &user).await.unwrap();

        let received = router.await.unwrap();
        assert_eq!(
            received[2],
            vec![
                "/ppp/secret/set",
                "=.id=*5",
                "=name=bob",
                "=password=pw",
                "=service=pppoe",
                "=profile=default",
                "=remote-address=",
                "=comment=",
                "=disabled=no",
            ]
        );
    }

    #[test]
    fn test_hotspot_set_attrs_clear_comment() {
        let attrs = hotspot_user_set_attrs(&HotspotUserRecord {
            name: "alice".to_string(),
            password: "pw".to_string(),
            ..Default::default()
        });
        assert!(attrs.contains(&("comment", String::new())));
        assert!(attrs.contains(&("profile", "default".to_string())));

        // add 仍然跳过未填写的字段
        let attrs = hotspot_user_attrs(&HotspotUserRecord::default());
        assert!(!attrs.iter().any(|(k, _)| *k == "comment"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = MikrotikClient::new(Duration::from_secs(2));
        let target = DeviceTarget::new("127.0.0.1", port, "admin", "x");
        let err = client.test_connection(&target).await.unwrap_err();
        assert!(err.is_connectivity());
    }
}
