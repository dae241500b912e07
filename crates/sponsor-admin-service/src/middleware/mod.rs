//! 中间件模块
//!
//! 提供认证中间件和当前用户提取器

mod auth;

pub use auth::{CurrentActor, auth_middleware};
