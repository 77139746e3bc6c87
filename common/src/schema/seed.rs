use anyhow::Context;
use serde::Deserialize;

use crate::schema::batch::NewBatch;
use crate::schema::stt::NewStt;

/// Initial data for an empty store: batches first, then tasks (so `old`
/// tasks can reference the batches by their insertion-order ids).
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub batches: Vec<NewBatch>,
    #[serde(default)]
    pub tasks: Vec<NewStt>,
}

impl SeedFile {
    pub async fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read seed file `{path}`"))?;
        serde_yaml::from_str(&contents).with_context(|| format!("Invalid YAML in `{path}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::stt::EntryType;
    use std::io::Write;

    #[tokio::test]
    async fn loads_batches_and_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
batches:
  - company_name: Acme Pty Ltd
    send_to: acme-main
    send_to_type: maropost_id
    invoice_to: billing@acme.example
    invoice_to_type: email
    frequency: 6
    month_start: 1
tasks:
  - machine_sku: SKU-1
    machine_name: Press 1
    entry_type: old
    stt_batch_id: 1
"#
        )
        .unwrap();

        let seed = SeedFile::from_yaml_file(path.to_str().unwrap()).await.unwrap();
        assert_eq!(seed.batches.len(), 1);
        assert_eq!(seed.tasks.len(), 1);
        assert_eq!(seed.tasks[0].entry_type, EntryType::Old);
        seed.batches[0].normalized().unwrap();
        seed.tasks[0].validate().unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(SeedFile::from_yaml_file("/nonexistent/seed.yaml").await.is_err());
    }
}
