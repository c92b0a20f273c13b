use crate::config::AppConfig;
use crate::db;
use crate::users::{DefaultUserService, InMemoryUserRepository, PgUserRepository, UserService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect_with_retry(&config.database).await?;
        if let Err(e) = db::run_migrations(&pool).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let users = DefaultUserService::new(PgUserRepository::new(pool))
            .with_max_page_size(config.api.max_page_size);

        Ok(Self::from_parts(Arc::new(users), config))
    }

    pub fn from_parts(users: Arc<dyn UserService>, config: Arc<AppConfig>) -> Self {
        Self { users, config }
    }

    /// State backed by an empty in-memory repository.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig::default());
        let users = DefaultUserService::new(InMemoryUserRepository::new())
            .with_max_page_size(config.api.max_page_size);
        Self::from_parts(Arc::new(users), config)
    }
}
