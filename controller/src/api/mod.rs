use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

use crate::error::ErrorDetail;
use crate::middleware::auth_middleware;
use crate::AppState;

pub mod handlers;

use handlers::ApiResponse;

/// 构建完整路由（API + 静态文件）
pub fn build_router(state: AppState) -> Router {
    // 公开路由（无需认证）
    let public_routes = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/debug/health", get(handlers::health));

    let protected_routes = Router::new()
        // 当前会话
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route("/auth/change-password", put(handlers::change_password))
        // 管理员
        .route("/admin/users", get(handlers::list_admins).post(handlers::create_admin))
        .route("/admin/users/{id}", put(handlers::update_admin).delete(handlers::delete_admin))
        // 设备
        .route("/devices", get(handlers::list_devices).post(handlers::create_device))
        .route(
            "/devices/{id}",
            get(handlers::get_device)
                .put(handlers::update_device)
                .delete(handlers::delete_device),
        )
        .route("/devices/{id}/test", post(handlers::test_device))
        .route("/devices/{id}/info", get(handlers::device_info))
        .route("/devices/{id}/sync", post(handlers::sync_device))
        // 用户
        .route("/users/hotspot", get(handlers::list_hotspot_users).post(handlers::create_hotspot_user))
        .route(
            "/users/hotspot/{id}",
            get(handlers::get_hotspot_user)
                .put(handlers::update_hotspot_user)
                .delete(handlers::delete_hotspot_user),
        )
        .route("/users/pppoe", get(handlers::list_pppoe_users).post(handlers::create_pppoe_user))
        .route(
            "/users/pppoe/{id}",
            get(handlers::get_pppoe_user)
                .put(handlers::update_pppoe_user)
                .delete(handlers::delete_pppoe_user),
        )
        .route("/users/sessions/{device_id}", get(handlers::active_sessions))
        .route("/users/sync/{device_id}", post(handlers::sync_users))
        // 套餐
        .route("/profiles/hotspot", post(handlers::create_hotspot_profile))
        .route("/profiles/hotspot/{device_id}", get(handlers::list_hotspot_profiles))
        .route("/profiles/pppoe", post(handlers::create_pppoe_profile))
        .route("/profiles/pppoe/{device_id}", get(handlers::list_pppoe_profiles))
        .route("/profiles/sync/{device_id}", post(handlers::sync_profiles))
        // 报表
        .route("/reports/monthly/{year}/{month}", get(handlers::monthly_report))
        .route("/reports/stats", get(handlers::dashboard_stats))
        // 本机状态
        .route("/system/stats", get(handlers::system_stats))
        .route("/system/info", get(handlers::system_info))
        .route("/system/process", get(handlers::process_stats))
        // 应用认证中间件
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = public_routes
        .merge(protected_routes)
        .fallback(api_not_found)
        .layer(from_fn_with_state(state.clone(), attach_error_detail));

    let static_dir = &state.config.static_dir;
    Router::new()
        // API 路由
        .nest("/api", api_routes)
        // 静态文件服务，带 SPA fallback
        .fallback_service(
            ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html"))),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        ApiResponse::<()>::error("Not found".to_string()),
    )
}

/// 非生产环境下把 5xx 的内部细节拼进 message
async fn attach_error_detail(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if state.config.is_production() {
        return response;
    }
    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };
    (
        response.status(),
        ApiResponse::<()>::error(format!("{}: {}", detail.message, detail.detail)),
    )
        .into_response()
}

/// 启动 Web API 服务，`shutdown` 收到信号后优雅退出
pub fn start_web_server(
    app_state: AppState,
    shutdown: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let web_addr = app_state.config.web_addr();
    let app = build_router(app_state);

    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(&web_addr).await {
            Ok(listener) => {
                info!("🌐 Web管理界面: http://{}", web_addr);
                let result = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.await;
                    })
                    .await;
                if let Err(err) = result {
                    tracing::error!("Web服务错误：{}", err);
                }
            }
            Err(err) => {
                tracing::error!("Web服务启动失败：{}", err);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Environment};
    use crate::entity::{HotspotUser, PppoeUser};
    use crate::test_support::{seed_admin, seed_device, seed_pppoe_user, test_state, FakeRouter};
    use axum::body::Body;
    use axum::http::{header, Method};
    use common::protocol::{ActiveSession, HotspotUserRecord, SessionKind};
    use http_body_util::BodyExt;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        state: AppState,
        router: FakeRouter,
    }

    impl TestApp {
        async fn new() -> Self {
            Self::with_config(Config::default()).await
        }

        async fn with_config(config: Config) -> Self {
            let (state, router) = test_state(config).await;
            Self { state, router }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            cookie: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Option<String>, Value) {
            let mut builder = axum::http::Request::builder().method(method).uri(uri);
            if let Some(cookie) = cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let response = build_router(self.state.clone())
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();

            let status = response.status();
            let set_cookie = response
                .headers()
                .get(header::SET_COOKIE)
                .map(|v| v.to_str().unwrap().to_string());
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, set_cookie, json)
        }

        /// 登录并返回 `name=value` 形式的 cookie
        async fn login(&self, username: &str, password: &str) -> String {
            let (status, set_cookie, _) = self
                .send(
                    Method::POST,
                    "/api/auth/login",
                    None,
                    Some(json!({ "username": username, "password": password })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            let set_cookie = set_cookie.unwrap();
            set_cookie.split(';').next().unwrap().to_string()
        }

        async fn admin(&self) -> (i64, String) {
            let admin = seed_admin(&self.state.db, "admin", "admin123", true).await;
            let cookie = self.login("admin", "admin123").await;
            (admin.id, cookie)
        }
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let app = TestApp::new().await;
        seed_admin(&app.state.db, "admin", "admin123", true).await;

        let (status, set_cookie, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "admin", "password": "admin123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["username"], "admin");
        assert!(body["data"]["user"].get("password_hash").is_none());

        let set_cookie = set_cookie.unwrap();
        assert!(set_cookie.starts_with("mikrodash_sid="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));

        let cookie = set_cookie.split(';').next().unwrap();
        let (status, _, body) = app.send(Method::GET, "/api/auth/me", Some(cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "admin");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let app = TestApp::new().await;
        seed_admin(&app.state.db, "admin", "admin123", true).await;
        seed_admin(&app.state.db, "retired", "retired123", false).await;

        let (status, _, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "admin", "password": "wrong-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password");

        let (status, _, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "retired", "password": "retired123" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Account is disabled");

        let (status, _, _) = app
            .send(Method::POST, "/api/auth/login", None, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let app = TestApp::new().await;

        let (status, _, body) = app.send(Method::GET, "/api/devices", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authenticated");

        let (status, _, body) = app
            .send(Method::GET, "/api/devices", Some("mikrodash_sid=forged"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Session expired or invalid");
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;

        let (status, set_cookie, _) = app
            .send(Method::POST, "/api/auth/logout", Some(&cookie), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(set_cookie.unwrap().starts_with("mikrodash_sid="));

        let (status, _, _) = app.send(Method::GET, "/api/auth/me", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_removed_admin_loses_session() {
        let app = TestApp::new().await;
        let (_, root) = app.admin().await;
        let other = seed_admin(&app.state.db, "operator", "operator1", true).await;
        let other_cookie = app.login("operator", "operator1").await;

        let (status, _, _) = app
            .send(Method::GET, "/api/auth/me", Some(&other_cookie), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = app
            .send(
                Method::DELETE,
                &format!("/api/admin/users/{}", other.id),
                Some(&root),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = app
            .send(Method::GET, "/api/auth/me", Some(&other_cookie), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_disabled_admin_loses_session() {
        let app = TestApp::new().await;
        let (_, root) = app.admin().await;
        let other = seed_admin(&app.state.db, "operator", "operator1", true).await;
        let other_cookie = app.login("operator", "operator1").await;

        let (status, _, body) = app
            .send(
                Method::PUT,
                &format!("/api/admin/users/{}", other.id),
                Some(&root),
                Some(json!({ "isActive": false })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isActive"], false);

        let (status, _, _) = app
            .send(Method::GET, "/api/devices", Some(&other_cookie), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_cannot_remove_self() {
        let app = TestApp::new().await;
        let (id, cookie) = app.admin().await;
        let uri = format!("/api/admin/users/{}", id);

        let (status, _, _) = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = app
            .send(Method::PUT, &uri, Some(&cookie), Some(json!({ "is_active": false })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = app.send(Method::GET, "/api/auth/me", Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_admin_username() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;

        let (status, _, body) = app
            .send(
                Method::POST,
                "/api/admin/users",
                Some(&cookie),
                Some(json!({ "username": "admin", "password": "another1" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username already exists: admin");

        let (status, _, _) = app
            .send(
                Method::POST,
                "/api/admin/users",
                Some(&cookie),
                Some(json!({ "username": "operator", "password": "short" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_change_password_revokes_other_sessions() {
        let app = TestApp::new().await;
        let (_, first) = app.admin().await;
        let second = app.login("admin", "admin123").await;

        let (status, _, _) = app
            .send(
                Method::PUT,
                "/api/auth/change-password",
                Some(&first),
                Some(json!({ "currentPassword": "admin123", "newPassword": "newpass1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = app.send(Method::GET, "/api/auth/me", Some(&first), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = app.send(Method::GET, "/api/auth/me", Some(&second), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        app.login("admin", "newpass1").await;
    }

    #[tokio::test]
    async fn test_duplicate_device_ip() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = json!({
            "name": "R1",
            "type": "mikrotik",
            "ip": "10.0.0.1",
            "username": "admin",
            "password": "x"
        });

        let (status, _, body) = app
            .send(Method::POST, "/api/devices", Some(&cookie), Some(device.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "offline");
        assert!(body["data"].get("password").is_none());

        let mut second = device;
        second["name"] = json!("R2");
        second["type"] = json!("switch");
        let (status, _, body) = app
            .send(Method::POST, "/api/devices", Some(&cookie), Some(second))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Device with IP 10.0.0.1 already exists: R1");
    }

    #[tokio::test]
    async fn test_device_connection_test_updates_status() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;
        let uri = format!("/api/devices/{}/test", device.id);

        let (status, _, body) = app.send(Method::POST, &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["connected"], true);
        assert_eq!(body["data"]["device"]["status"], "online");

        app.router.with_state(|s| s.unreachable = true);
        let (status, _, body) = app.send(Method::POST, &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["connected"], false);
        assert_eq!(body["data"]["device"]["status"], "offline");
    }

    #[tokio::test]
    async fn test_hotspot_create_rolls_back_on_router_failure() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;
        app.router.with_state(|s| s.reject_writes = true);

        let (status, _, body) = app
            .send(
                Method::POST,
                "/api/users/hotspot",
                Some(&cookie),
                Some(json!({ "deviceId": device.id, "username": "alice", "password": "pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Router communication failed"));
        assert!(message.contains("not permitted"));
        assert_eq!(HotspotUser::find().count(&app.state.db).await.unwrap(), 0);

        app.router.with_state(|s| s.reject_writes = false);
        let (status, _, _) = app
            .send(
                Method::POST,
                "/api/users/hotspot",
                Some(&cookie),
                Some(json!({ "deviceId": device.id, "username": "alice", "password": "pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(HotspotUser::find().count(&app.state.db).await.unwrap(), 1);
        assert_eq!(app.router.with_state(|s| s.hotspot_users.len()), 1);

        let (status, _, _) = app
            .send(
                Method::POST,
                "/api/users/hotspot",
                Some(&cookie),
                Some(json!({ "deviceId": device.id, "username": "alice", "password": "pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_production_hides_error_detail() {
        let app = TestApp::with_config(Config {
            environment: Environment::Production,
            ..Config::default()
        })
        .await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;
        app.router.with_state(|s| s.unreachable = true);

        let (status, _, body) = app
            .send(
                Method::GET,
                &format!("/api/devices/{}/info", device.id),
                Some(&cookie),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Router communication failed");
    }

    #[tokio::test]
    async fn test_hotspot_update_failure_stores_nothing() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;

        let (_, _, body) = app
            .send(
                Method::POST,
                "/api/users/hotspot",
                Some(&cookie),
                Some(json!({ "deviceId": device.id, "username": "alice", "password": "pw" })),
            )
            .await;
        let id = body["data"]["id"].as_i64().unwrap();
        let uri = format!("/api/users/hotspot/{}", id);

        app.router.with_state(|s| s.reject_writes = true);
        let (status, _, _) = app
            .send(Method::PUT, &uri, Some(&cookie), Some(json!({ "status": "disabled" })))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, _, body) = app.send(Method::GET, &uri, Some(&cookie), None).await;
        assert_eq!(body["data"]["status"], "active");

        app.router.with_state(|s| s.reject_writes = false);
        let (status, _, body) = app
            .send(Method::PUT, &uri, Some(&cookie), Some(json!({ "status": "disabled" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "disabled");
        assert!(app.router.with_state(|s| s.hotspot_users[0].disabled));
    }

    #[tokio::test]
    async fn test_pppoe_delete_is_best_effort_on_router() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;

        let (status, _, body) = app
            .send(
                Method::POST,
                "/api/users/pppoe",
                Some(&cookie),
                Some(json!({
                    "deviceId": device.id,
                    "username": "bob",
                    "password": "pw",
                    "customerName": "Bob",
                    "monthlyCost": 25.0
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["service"], "pppoe");
        let id = body["data"]["id"].as_i64().unwrap();

        app.router.with_state(|s| s.unreachable = true);
        let (status, _, _) = app
            .send(
                Method::DELETE,
                &format!("/api/users/pppoe/{}", id),
                Some(&cookie),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(PppoeUser::find().count(&app.state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pppoe_metadata_update_skips_router() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;
        let user = seed_pppoe_user(&app.state.db, device.id, "bob", 20.0, "active").await;
        let uri = format!("/api/users/pppoe/{}", user.id);

        let (status, _, body) = app
            .send(
                Method::PUT,
                &uri,
                Some(&cookie),
                Some(json!({ "customerPhone": "555-0100", "monthlyCost": 30.0 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["monthlyCost"], 30.0);
        assert!(!app.router.calls().iter().any(|c| c == "update_pppoe_user"));

        let (status, _, _) = app
            .send(
                Method::PUT,
                &uri,
                Some(&cookie),
                Some(json!({ "ipAddress": "10.10.0.7" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(app.router.calls().iter().any(|c| c == "update_pppoe_user"));
    }

    #[tokio::test]
    async fn test_user_sync_and_sessions() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;
        app.router.with_state(|s| {
            s.hotspot_users = vec![HotspotUserRecord {
                name: "carol".into(),
                password: "pw".into(),
                ..Default::default()
            }];
            s.sessions = vec![ActiveSession {
                kind: SessionKind::Hotspot,
                username: "carol".into(),
                address: Some("10.5.50.2".into()),
                mac_address: None,
                uptime: "5m".into(),
                uptime_secs: 300,
                bytes_in: 1000,
                bytes_out: 2000,
            }];
        });

        let uri = format!("/api/users/sync/{}", device.id);
        let (status, _, body) = app.send(Method::POST, &uri, Some(&cookie), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["kind"], "hotspot_users");
        assert_eq!(body["data"][0]["inserted"], 1);

        let (_, _, body) = app.send(Method::POST, &uri, Some(&cookie), None).await;
        assert_eq!(body["data"][0]["inserted"], 0);
        assert_eq!(body["data"][0]["skipped"], 1);

        let (status, _, body) = app
            .send(
                Method::GET,
                &format!("/api/users/sessions/{}", device.id),
                Some(&cookie),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["username"], "carol");

        let (_, _, body) = app
            .send(Method::GET, "/api/reports/stats", Some(&cookie), None)
            .await;
        assert_eq!(body["data"]["activeSessions"], 1);
        assert_eq!(body["data"]["totalHotspotUsers"], 1);
    }

    #[tokio::test]
    async fn test_profile_create_requires_router() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let device = seed_device(&app.state.db, "R1", "10.0.0.1").await;
        let profile = json!({ "deviceId": device.id, "name": "10M", "rateLimit": "10M/10M" });

        app.router.with_state(|s| s.reject_writes = true);
        let (status, _, _) = app
            .send(Method::POST, "/api/profiles/pppoe", Some(&cookie), Some(profile.clone()))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        app.router.with_state(|s| s.reject_writes = false);
        let (status, _, _) = app
            .send(Method::POST, "/api/profiles/pppoe", Some(&cookie), Some(profile.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = app
            .send(Method::POST, "/api/profiles/pppoe", Some(&cookie), Some(profile))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, _, body) = app
            .send(
                Method::GET,
                &format!("/api/profiles/pppoe/{}", device.id),
                Some(&cookie),
                None,
            )
            .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["rateLimit"], "10M/10M");
    }

    #[tokio::test]
    async fn test_monthly_report_rejects_invalid_month() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;

        let (status, _, _) = app
            .send(Method::GET, "/api/reports/monthly/2025/13", Some(&cookie), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = app
            .send(Method::GET, "/api/reports/monthly/2147483647/12", Some(&cookie), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = app
            .send(Method::GET, "/api/reports/monthly/2025/3", Some(&cookie), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalSessions"], 0);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new().await;
        let (status, _, body) = app.send(Method::GET, "/api/debug/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["environment"], "development");
    }

    #[tokio::test]
    async fn test_unknown_api_route_is_json_404() {
        let app = TestApp::new().await;
        let (_, cookie) = app.admin().await;
        let (status, _, body) = app
            .send(Method::GET, "/api/nothing-here", Some(&cookie), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
