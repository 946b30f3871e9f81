//! RouterOS API 客户端
//!
//! - `codec`: 长度前缀 word / sentence 编解码
//! - `reply`: 回复解析和命令构造
//! - `connection`: 单条连接（登录、执行、关闭）
//! - `client`: 面向业务的 [`MikrotikClient`]，实现 [`crate::protocol::RouterControl`]

pub mod client;
pub mod codec;
pub mod connection;
pub mod error;
pub mod reply;

pub use client::{parse_uptime, MikrotikClient};
pub use connection::{run_scoped, ApiConnection, SessionFuture};
pub use error::{Result, RouterOsError};
pub use reply::{Attributes, Command, Reply, ReplyKind, Response};
