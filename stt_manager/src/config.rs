use anyhow::Context;

use crate::state::AppState;

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub neto_url: String,
    pub neto_username: String,
    pub neto_api_key: String,
    pub seed_yaml: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid TCP port")?;

        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let neto_url = std::env::var("NETO_URL").context("NETO_URL must be set")?;

        let neto_username =
            std::env::var("NETO_API_USERNAME").context("NETO_API_USERNAME must be set")?;

        let neto_api_key = std::env::var("NETO_API_KEY").context("NETO_API_KEY must be set")?;

        let seed_yaml = std::env::var("SEED_YAML").ok();

        Ok(Self {
            host,
            port,
            database_url,
            neto_url,
            neto_username,
            neto_api_key,
            seed_yaml,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        AppState::new(
            &self.database_url,
            &self.neto_url,
            &self.neto_username,
            &self.neto_api_key,
        )
        .await
        .context("Failed to initialize AppState")
    }
}
