//! 会议赞助管理后台服务
//!
//! 提供赞助商管理、物料发货跟踪、赞助邮件等 REST API。

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
};
use sponsor_admin_service::{auth::JwtConfig, routes, state::AppState};
use sponsor_shared::{config::AppConfig, database::Database, observability};
use sponsorship_core::{
    LocalPictureStore, LogEmailChannel, MailQueue, PgAuditLog, SponsorshipRepository,
    SponsorshipService,
};
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing::{info, warn};

const SERVICE_NAME: &str = "sponsor-admin-service";

/// multipart 包装的额外开销
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：config/{service_name}.toml + SPONSOR_ 前缀环境变量
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config)?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    if config.is_production() && config.auth.jwt_secret == JwtConfig::default().secret {
        anyhow::bail!("SPONSOR_AUTH__JWT_SECRET must be set in production environment");
    }

    // 初始化基础设施：连接并迁移
    let db = Database::open(&config.database).await?;

    // 邮件队列：发件人在此一次性注入，后台 worker 负责投递
    let (mail_queue, email_worker) = MailQueue::new(
        config.sponsors.email_from.clone(),
        config.sponsors.email_queue_capacity,
        Arc::new(LogEmailChannel),
    );
    tokio::spawn(email_worker.run());
    info!(from = %config.sponsors.email_from, "Email worker started");

    let pictures = LocalPictureStore::new(
        &config.sponsors.picture_dir,
        config.sponsors.max_picture_bytes,
    );

    let service = SponsorshipService::new(
        Arc::new(SponsorshipRepository::new(db.pool().clone())),
        Arc::new(PgAuditLog::new(db.pool().clone())),
        Arc::new(mail_queue),
        Arc::new(pictures),
    );

    let state = AppState::new(service, JwtConfig::from(&config.auth)).with_database(db.clone());

    let app = routes::app(state)
        .layer(DefaultBodyLimit::max(
            config.sponsors.max_picture_bytes + MULTIPART_OVERHEAD,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(CompressionLayer::new())
        .layer(cors_layer(config.is_production()));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// CORS 配置：通过 SPONSOR_CORS_ORIGINS 环境变量控制允许的来源
fn cors_layer(production: bool) -> CorsLayer {
    let allowed_origins = std::env::var("SPONSOR_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    if allowed_origins == "*" {
        if production {
            warn!("SPONSOR_CORS_ORIGINS=\"*\" is unsafe in production");
        }
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    response
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
