//! 应用共享状态

use std::sync::Arc;

use sponsor_shared::database::Database;
use sponsorship_core::SponsorshipService;

use crate::auth::{JwtConfig, JwtManager};

/// 应用状态
///
/// 在所有请求处理器之间共享
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SponsorshipService>,
    pub jwt: Arc<JwtManager>,
    /// 就绪检查使用的数据库连接，内存模式下为空
    pub db: Option<Database>,
}

impl AppState {
    /// 创建应用状态
    pub fn new(service: SponsorshipService, jwt_config: JwtConfig) -> Self {
        Self {
            service: Arc::new(service),
            jwt: Arc::new(JwtManager::new(jwt_config)),
            db: None,
        }
    }

    /// 挂载数据库连接，用于 /ready 检查
    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }
}
