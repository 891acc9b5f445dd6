use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub org_membership_cache: Cache<String, bool>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_pool = match config.database_url.as_deref() {
            Some(url) => Some(db::build_pool(url, &config)?),
            None => None,
        };

        let org_membership_cache = Cache::builder()
            .max_capacity(config.org_membership_cache_max_entries)
            .time_to_live(Duration::from_secs(config.org_membership_cache_ttl_seconds))
            .build();

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            org_membership_cache,
        })
    }

    pub fn db_pool(&self) -> AppResult<&PgPool> {
        self.db_pool.as_ref().ok_or_else(|| {
            AppError::Dependency("Database is not configured. Set DATABASE_URL.".to_string())
        })
    }
}
