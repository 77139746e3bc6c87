use anyhow::{Context, Result};
use chrono::Datelike;
use common::{Database, SeedFile};

use crate::calendar::CalendarView;
use crate::neto::NetoClient;

pub struct AppState {
    pub db: Database,
    pub neto: NetoClient,
    pub calendar: CalendarView,
}

impl AppState {
    pub async fn new(
        database_url: &str,
        neto_url: &str,
        neto_username: &str,
        neto_api_key: &str,
    ) -> Result<Self> {
        let db = Database::new(database_url).await?;
        log::info!("Database initialized successfully!");

        let neto = NetoClient::new(neto_url, neto_username, neto_api_key)?;
        let calendar = CalendarView::new(chrono::Utc::now().month());

        Ok(AppState { db, neto, calendar })
    }

    /// Loads batches and tasks from a YAML file into an empty store.
    /// A store that already holds data is left untouched.
    pub async fn initialize_data_from_file(&self, seed_yaml: &str) -> Result<()> {
        if self.db.count_batches().await? > 0 || self.db.count_stt().await? > 0 {
            log::info!("Store already contains data, skipping seed file `{seed_yaml}`");
            return Ok(());
        }

        let seed = SeedFile::from_yaml_file(seed_yaml)
            .await
            .with_context(|| format!("Failed to load seed data from `{seed_yaml}`"))?;

        for (index, batch) in seed.batches.iter().enumerate() {
            let fields = batch
                .normalized()
                .with_context(|| format!("Invalid seed batch at index {index}"))?;
            self.db
                .save_batch(&fields)
                .await
                .with_context(|| format!("Failed to save seed batch `{}`", fields.company_name))?;
        }

        for (index, task) in seed.tasks.iter().enumerate() {
            task.validate()
                .with_context(|| format!("Invalid seed task at index {index}"))?;
            self.db
                .save_stt(task)
                .await
                .with_context(|| format!("Failed to save seed task `{}`", task.machine_sku))?;
        }

        log::info!(
            "Seeded {} batches and {} tasks from `{seed_yaml}`",
            seed.batches.len(),
            seed.tasks.len()
        );
        Ok(())
    }
}
