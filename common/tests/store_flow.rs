use std::io::Write;

use common::{Database, EntryType, SeedFile, is_due};

const SEED: &str = r#"
batches:
  - company_name: Acme Pty Ltd
    send_to: acme-main
    send_to_type: maropost_id
    invoice_to: billing@acme.example
    invoice_to_type: email
    frequency: 3
    month_start: 11
tasks:
  - machine_sku: SKU-OLD
    machine_name: Press 1
    entry_type: old
    stt_batch_id: 1
  - machine_sku: SKU-NEW
    machine_name: Press 2
    entry_type: new
    frequency: 12
    month_start: 1
    send_to: ops@example.com
    send_to_type: email
    invoice_to: billing@example.com
    invoice_to_type: email
"#;

async fn seeded_db(dir: &tempfile::TempDir) -> Database {
    let seed_path = dir.path().join("seed.yaml");
    let mut file = std::fs::File::create(&seed_path).unwrap();
    write!(file, "{SEED}").unwrap();

    let url = format!("sqlite://{}", dir.path().join("stt.db").display());
    let db = Database::new(&url).await.unwrap();

    let seed = SeedFile::from_yaml_file(seed_path.to_str().unwrap())
        .await
        .unwrap();
    for batch in &seed.batches {
        db.save_batch(&batch.normalized().unwrap()).await.unwrap();
    }
    for task in &seed.tasks {
        task.validate().unwrap();
        db.save_stt(task).await.unwrap();
    }
    db
}

#[tokio::test]
async fn seeded_store_satisfies_the_listing_contract() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(&dir).await;

    let list = db.get_stt_list().await.unwrap();
    assert_eq!(list.len(), 2);
    // newest first
    assert_eq!(list[0].machine_sku, "SKU-NEW");
    assert_eq!(list[1].machine_sku, "SKU-OLD");
    assert!(list.iter().all(|record| !record.deleted));

    let old_entry = &list[1];
    assert_eq!(old_entry.entry_type, EntryType::Old);
    assert!(old_entry.frequency.is_none());
    assert_eq!(old_entry.stt_batch_id, Some(1));
}

#[tokio::test]
async fn seeded_batch_drives_the_recurrence_of_its_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(&dir).await;

    let lookup = db.get_batches_by_ids(&[1, 77]).await.unwrap();
    assert_eq!(lookup.results.len(), 1);
    assert_eq!(lookup.errors.len(), 1);
    assert_eq!(lookup.errors[0].id, "77");

    let batch = &lookup.results[0];
    assert_eq!(batch.company_name, "Acme Pty Ltd");
    // November start, quarterly: due in February across the year boundary
    assert!(is_due(batch.month_start, batch.frequency, 11));
    assert!(is_due(batch.month_start, batch.frequency, 2));
    assert!(!is_due(batch.month_start, batch.frequency, 12));
}

#[tokio::test]
async fn deleting_the_batch_does_not_cascade_to_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(&dir).await;

    assert!(db.soft_delete_batch(1).await.unwrap());

    let lookup = db.get_batches_by_ids(&[1]).await.unwrap();
    assert!(lookup.results.is_empty());
    assert_eq!(lookup.errors.len(), 1);

    // the referencing task is still listed; it just has nothing to merge
    let list = db.get_stt_list().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].stt_batch_id, Some(1));
}
