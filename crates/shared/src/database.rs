//! 赞助库连接
//!
//! 启动时建立连接池并应用 migrations/ 下的全部迁移，就绪检查复用同一个池。

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};

/// 编译期嵌入的迁移脚本
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// 赞助库连接池
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// 按配置构造连接池参数
fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

impl Database {
    /// 连接并迁移到最新结构
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let pool = pool_options(config).connect(&config.url).await?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| SharedError::Migration(e.to_string()))?;
        info!(migrations = MIGRATOR.iter().count(), "Sponsorship database ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 就绪检查
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// 等待在途查询结束后关闭
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Sponsorship database closed");
    }
}
