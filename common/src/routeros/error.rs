use std::time::Duration;

use thiserror::Error;

/// RouterOS API 调用错误
///
/// 所有变体的 `Display` 输出都附带路由器返回的原始信息，
/// 调用方可以直接记录或返回给前端。
#[derive(Debug, Error)]
pub enum RouterOsError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("login failed: {0}")]
    Login(String),

    #[error("router error: {message}")]
    Trap {
        message: String,
        category: Option<u32>,
    },

    #[error("router closed the session: {0}")]
    Fatal(String),

    #[error("no such item on router: {0}")]
    NotFound(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RouterOsError {
    /// 是否为连接层面的失败（连不上、超时、会话被关闭）
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            RouterOsError::Connect { .. }
                | RouterOsError::Io(_)
                | RouterOsError::Timeout(_)
                | RouterOsError::Fatal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RouterOsError>;
