//! mikrodash 公共库
//!
//! - `routeros`: RouterOS API 二进制协议（编解码、连接、设备客户端）
//! - `protocol`: Controller 使用的路由器控制接口与记录类型

pub mod protocol;
pub mod routeros;
