//! 认证模块
//!
//! Token 由外部身份系统签发，本服务负责校验并解析出当前操作人

mod jwt;

pub use jwt::{Claims, JwtConfig, JwtManager};
