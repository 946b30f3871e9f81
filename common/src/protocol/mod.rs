//! Controller 与路由器之间的控制接口
//!
//! 定义了 `RouterControl` trait 以及路由器返回的记录类型。
//! 生产环境由 `routeros::MikrotikClient` 实现，测试中可以替换为内存实现。

pub mod router;

pub use router::*;
