//! 路由配置模块
//!
//! 管理端与提交者端共用处理器，仅访问门面不同

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use sponsor_shared::observability::middleware as obs_middleware;
use sponsorship_core::{AccessFacade, AdminFacade, SubmitterFacade};

use crate::{
    handlers::{email, health, picture, shipment, sponsorship},
    middleware::auth_middleware,
    state::AppState,
};

/// 管理端路由前缀
pub const ADMIN_PREFIX: &str = "/api/admin/conferences/{short_title}/sponsors";

/// 提交者端路由前缀
pub const SUBMITTER_PREFIX: &str = "/api/conferences/{short_title}/sponsorships";

/// 构建赞助相关路由
fn sponsorship_routes<F: AccessFacade>(prefix: &str) -> Router<AppState> {
    let item = format!("{prefix}/{{id}}");

    Router::new()
        .route(
            prefix,
            get(sponsorship::index::<F>).post(sponsorship::create::<F>),
        )
        .route(&format!("{prefix}/new"), get(sponsorship::new_form::<F>))
        .route(&format!("{prefix}/pictures"), post(picture::upload::<F>))
        .route(
            &item,
            get(sponsorship::show::<F>)
                .put(sponsorship::update::<F>)
                .patch(sponsorship::update::<F>)
                .delete(sponsorship::destroy::<F>),
        )
        // 状态流转
        .route(&format!("{item}/confirm"), post(sponsorship::confirm::<F>))
        .route(&format!("{item}/cancel"), post(sponsorship::cancel::<F>))
        .route(
            &format!("{item}/contacted"),
            post(sponsorship::contacted::<F>),
        )
        .route(
            &format!("{item}/unconfirmed"),
            post(sponsorship::unconfirmed::<F>),
        )
        // 邮件
        .route(
            &format!("{item}/email"),
            get(email::prepare::<F>).post(email::send::<F>),
        )
        // 物料状态
        .route(&format!("{item}/swags"), get(sponsorship::swags::<F>))
}

/// 管理端路由，到货跟踪仅管理端开放
pub fn admin_routes() -> Router<AppState> {
    sponsorship_routes::<AdminFacade>(ADMIN_PREFIX).route(
        &format!("{ADMIN_PREFIX}/{{id}}/shipments/{{shipment_id}}/arrival"),
        patch(shipment::record_arrival::<AdminFacade>),
    )
}

/// 提交者端路由
pub fn submitter_routes() -> Router<AppState> {
    sponsorship_routes::<SubmitterFacade>(SUBMITTER_PREFIX)
}

/// 组装完整应用：业务路由、探针、认证与可观测性中间件
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(admin_routes())
        .merge(submitter_routes())
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        // 认证中间件：验证 JWT Token
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
