use axum::Json;
use serde::Serialize;

mod admin_user;
mod auth;
mod debug;
mod device;
mod hotspot;
mod pppoe;
mod profile;
mod report;
mod system;

pub use admin_user::*;
pub use auth::*;
pub use debug::*;
pub use device::*;
pub use hotspot::*;
pub use pppoe::*;
pub use profile::*;
pub use report::*;
pub use system::*;

/// 统一响应格式 `{ success, data, message }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Self::success_with_message(data, "success")
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: message.into(),
        })
    }

    pub fn error(message: String) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            message,
        })
    }
}

/// 可选文本字段：去掉首尾空白，空串视为未填写
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
