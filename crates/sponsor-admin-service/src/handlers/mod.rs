//! HTTP 请求处理器模块
//!
//! 处理器对访问门面泛型化，管理端与提交者端共用同一套实现：
//! 路由注册时以 `AdminFacade` 或 `SubmitterFacade` 实例化。

pub mod email;
pub mod health;
pub mod picture;
pub mod shipment;
pub mod sponsorship;

use sponsorship_core::{AccessFacade, Actor, SponsorshipAccess};

use crate::error::Result;
use crate::state::AppState;

/// 解析会议并完成授权，所有业务操作之前调用
async fn authorize<F: AccessFacade>(
    state: &AppState,
    actor: &Actor,
    short_title: &str,
) -> Result<SponsorshipAccess> {
    Ok(state.service.access::<F>(actor, short_title).await?)
}
