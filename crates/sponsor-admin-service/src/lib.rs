//! 会议赞助管理后台服务
//!
//! 提供赞助商管理端与赞助提交者端的 REST API。
//!
//! ## 模块结构
//!
//! - `auth`: JWT 校验与当前用户解析
//! - `dto`: 请求/响应数据传输对象
//! - `error`: 错误类型与 HTTP 响应映射
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证中间件
//! - `routes`: 路由配置
//! - `state`: 应用共享状态

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{AdminError, Result};
pub use state::AppState;
