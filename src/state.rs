use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::password::CredentialHandler;
use crate::config::AppConfig;
use crate::users::{
    memory::MemoryUserStore,
    repo::{PgUserStore, UserStore},
    services::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                tracing::info!("using postgres user store");
                Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>
            }
            None => {
                tracing::warn!("DATABASE_URL not set; users are kept in memory only");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        let credentials = CredentialHandler::new(&config.argon2)?;
        Ok(Self::from_parts(config, store, credentials))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn UserStore>,
        credentials: CredentialHandler,
    ) -> Self {
        Self {
            users: UserService::new(store, credentials),
            config,
        }
    }
}
