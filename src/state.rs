use crate::config::AppConfig;
use crate::store::DataStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DataStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(DataStore::initialize(&config).await);
        Ok(Self { store, config })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = test_config();
        let store = DataStore::sample(config.activity_log_retention);
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    use crate::config::{DataSource, JwtConfig};

    AppConfig {
        data_source: DataSource::Sample,
        database_url: None,
        jwt: JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        },
        activity_log_retention: 50,
    }
}
