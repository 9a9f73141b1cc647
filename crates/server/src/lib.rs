//! shipline HTTP/WebSocket 服务端。
//!
//! 路由组装放在库里，二进制与集成测试共用同一个 Router。

pub mod api;
