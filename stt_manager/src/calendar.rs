use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDateTime;
use common::{Database, EntryType, SttBatch, SttRecord, is_due};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;

/// An STT record with its batch fields overlaid. Built fresh for every
/// render pass and thrown away on the next one; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MergedStt {
    #[serde(flatten)]
    pub record: SttRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_month_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_info: Option<SttBatch>,
    pub scheduled_at: Option<NaiveDateTime>,
}

impl MergedStt {
    fn bare(record: SttRecord) -> Self {
        MergedStt {
            record,
            batch_month_start: None,
            batch_frequency: None,
            batch_info: None,
            scheduled_at: None,
        }
    }

    fn effective_schedule(&self) -> Option<(i64, i64)> {
        match self.record.entry_type {
            EntryType::New => self.record.month_start.zip(self.record.frequency),
            EntryType::Old => self.batch_month_start.zip(self.batch_frequency),
        }
    }

    /// Whether this entry recurs in `target_month`. An `old` entry whose
    /// batch never resolved has no schedule and is simply never due.
    pub fn is_due_in(&self, target_month: u32) -> bool {
        match self.effective_schedule() {
            Some((month_start, frequency)) => is_due(month_start, frequency, target_month),
            None => false,
        }
    }
}

/// Overlays the referenced batch onto one record. Failures stay local to
/// the record: the merged copy just carries no batch fields.
pub async fn resolve_batch(db: &Database, record: SttRecord) -> MergedStt {
    let mut merged = MergedStt::bare(record);
    if merged.record.entry_type != EntryType::Old {
        return merged;
    }
    let Some(batch_id) = merged.record.stt_batch_id else {
        log::warn!(
            "STT {} is batch-backed but has no stt_batch_id",
            merged.record.id
        );
        return merged;
    };

    match db.get_batches_by_ids(&[batch_id]).await {
        Ok(lookup) => {
            if let Some(batch) = lookup.results.into_iter().next() {
                merged.record.send_to = Some(batch.send_to.clone());
                merged.record.send_to_type = Some(batch.send_to_type);
                merged.record.invoice_to = Some(batch.invoice_to.clone());
                merged.record.invoice_to_type = Some(batch.invoice_to_type);
                merged.batch_month_start = Some(batch.month_start);
                merged.batch_frequency = Some(batch.frequency);
                merged.batch_info = Some(batch);
            } else {
                for error in &lookup.errors {
                    log::warn!(
                        "No batch data for STT {} (batch {}): {}",
                        merged.record.id,
                        error.id,
                        error.message
                    );
                }
            }
        }
        Err(e) => {
            log::error!("Batch lookup failed for STT {}: {e:#}", merged.record.id);
        }
    }
    merged
}

/// Resolves every record's batch reference concurrently and waits for all
/// of them, preserving the listing order.
pub async fn merge_batch_info(db: &Database, records: Vec<SttRecord>) -> Vec<MergedStt> {
    join_all(records.into_iter().map(|record| resolve_batch(db, record))).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Loading,
    Ready,
}

struct ViewBuffer {
    state: ViewState,
    month: u32,
    entries: Vec<MergedStt>,
}

/// Month-by-month recurrence view over all live STT entries. Holds the
/// month cursor and the merged record buffer; month navigation reuses the
/// buffer, a refresh rebuilds it.
pub struct CalendarView {
    buffer: Mutex<ViewBuffer>,
    refresh_seq: AtomicU64,
}

impl CalendarView {
    pub fn new(initial_month: u32) -> Self {
        CalendarView {
            buffer: Mutex::new(ViewBuffer {
                state: ViewState::Loading,
                month: initial_month.clamp(1, 12),
                entries: Vec::new(),
            }),
            refresh_seq: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> ViewState {
        self.buffer.lock().await.state
    }

    pub async fn current_month(&self) -> u32 {
        self.buffer.lock().await.month
    }

    /// Month navigation: moves the cursor and reapplies the filter to the
    /// cached buffer without touching the store.
    pub async fn set_month(&self, month: u32) -> Vec<MergedStt> {
        let mut buffer = self.buffer.lock().await;
        buffer.month = month;
        filter_due(&buffer.entries, month)
    }

    /// Re-fetches the task list, re-resolves batches, attaches schedule
    /// annotations for `month` and filters. Each refresh takes a ticket;
    /// a result that arrives after a newer refresh started is discarded
    /// rather than overwriting the fresher buffer. A failed fetch keeps
    /// the previous buffer and degrades to whatever it filters to.
    pub async fn refresh(&self, db: &Database, month: u32) -> Vec<MergedStt> {
        let ticket = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let rebuilt = match db.get_stt_list().await {
            Ok(records) => {
                let mut merged = merge_batch_info(db, records).await;
                attach_annotations(db, &mut merged, month).await;
                Some(merged)
            }
            Err(e) => {
                log::error!("Failed to fetch STT entries, keeping previous view: {e:#}");
                None
            }
        };

        let mut buffer = self.buffer.lock().await;
        buffer.month = month;
        if let Some(entries) = rebuilt {
            if self.refresh_seq.load(Ordering::SeqCst) == ticket {
                buffer.entries = entries;
                buffer.state = ViewState::Ready;
            } else {
                log::debug!("Discarding stale refresh result (ticket {ticket})");
            }
        }
        filter_due(&buffer.entries, month)
    }
}

async fn attach_annotations(db: &Database, entries: &mut [MergedStt], month: u32) {
    let annotations = match db.get_annotations_for_month(month).await {
        Ok(annotations) => annotations,
        Err(e) => {
            log::warn!("Failed to fetch schedule annotations: {e:#}");
            return;
        }
    };
    // Oldest first, so the last insert per object wins.
    let mut latest: HashMap<i64, NaiveDateTime> = HashMap::new();
    for annotation in annotations {
        latest.insert(annotation.object_id, annotation.scheduled_at);
    }
    for entry in entries.iter_mut() {
        entry.scheduled_at = latest.get(&entry.record.id).copied();
    }
}

fn filter_due(entries: &[MergedStt], month: u32) -> Vec<MergedStt> {
    entries.iter().filter(|e| e.is_due_in(month)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use common::{NewBatch, NewStt, RecipientType};

    fn batch_payload(month_start: i64, frequency: i64) -> NewBatch {
        NewBatch {
            company_name: Some("Acme Pty Ltd".into()),
            send_to_type: Some(RecipientType::MaropostId),
            invoice_to_type: Some(RecipientType::Email),
            send_to: Some("acme-main".into()),
            invoice_to: Some("billing@acme.example".into()),
            frequency: Some(frequency),
            stt_batch_notes: None,
            month_start: Some(month_start),
        }
    }

    fn new_stt(sku: &str, month_start: i64, frequency: i64) -> NewStt {
        NewStt {
            machine_sku: sku.into(),
            machine_name: format!("Machine {sku}"),
            entry_type: EntryType::New,
            frequency: Some(frequency),
            month_start: Some(month_start),
            send_to: Some("ops@example.com".into()),
            send_to_type: Some(RecipientType::Email),
            invoice_to: Some("billing@example.com".into()),
            invoice_to_type: Some(RecipientType::Email),
            stt_batch_id: None,
            stt_notes: None,
        }
    }

    fn old_stt(sku: &str, batch_id: i64) -> NewStt {
        NewStt {
            machine_sku: sku.into(),
            machine_name: format!("Machine {sku}"),
            entry_type: EntryType::Old,
            frequency: None,
            month_start: None,
            send_to: None,
            send_to_type: None,
            invoice_to: None,
            invoice_to_type: None,
            stt_batch_id: Some(batch_id),
            stt_notes: None,
        }
    }

    #[tokio::test]
    async fn merge_overlays_batch_fields_onto_old_entries() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let batch = state
            .db
            .save_batch(&batch_payload(3, 4).normalized().unwrap())
            .await
            .unwrap();
        state.db.save_stt(&old_stt("SKU-1", batch.id)).await.unwrap();

        let merged = merge_batch_info(&state.db, state.db.get_stt_list().await.unwrap()).await;
        assert_eq!(merged.len(), 1);
        let entry = &merged[0];
        assert_eq!(entry.batch_month_start, Some(3));
        assert_eq!(entry.batch_frequency, Some(4));
        assert_eq!(entry.record.send_to.as_deref(), Some("acme-main"));
        assert_eq!(entry.record.invoice_to.as_deref(), Some("billing@acme.example"));
        assert_eq!(
            entry.batch_info.as_ref().map(|b| b.company_name.as_str()),
            Some("Acme Pty Ltd")
        );
        assert!(entry.is_due_in(3));
        assert!(entry.is_due_in(7));
        assert!(!entry.is_due_in(5));
    }

    #[tokio::test]
    async fn unresolvable_batch_excludes_the_entry_from_every_month() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        state.db.save_stt(&old_stt("SKU-1", 9999)).await.unwrap();

        let merged = merge_batch_info(&state.db, state.db.get_stt_list().await.unwrap()).await;
        assert_eq!(merged.len(), 1);
        assert!(merged[0].batch_info.is_none());
        for month in 1..=12 {
            assert!(!merged[0].is_due_in(month));
        }

        let due = state.calendar.refresh(&state.db, 1).await;
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn one_failed_resolution_leaves_siblings_intact() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let batch = state
            .db
            .save_batch(&batch_payload(1, 1).normalized().unwrap())
            .await
            .unwrap();
        let good = state.db.save_stt(&old_stt("SKU-A", batch.id)).await.unwrap();
        state.db.save_stt(&old_stt("SKU-B", 9999)).await.unwrap();

        let due = state.calendar.refresh(&state.db, 6).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].record.id, good.id);
        assert!(due[0].batch_info.is_some());
    }

    #[tokio::test]
    async fn refresh_filters_by_month_and_preserves_listing_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let january = state.db.save_stt(&new_stt("SKU-JAN", 1, 12)).await.unwrap();
        let march = state.db.save_stt(&new_stt("SKU-MAR", 3, 12)).await.unwrap();
        let monthly = state.db.save_stt(&new_stt("SKU-ALL", 1, 1)).await.unwrap();

        let due = state.calendar.refresh(&state.db, 1).await;
        let ids: Vec<i64> = due.iter().map(|e| e.record.id).collect();
        // newest first, as listed; the march-only entry is filtered out
        assert_eq!(ids, vec![monthly.id, january.id]);

        let due = state.calendar.set_month(3).await;
        let ids: Vec<i64> = due.iter().map(|e| e.record.id).collect();
        assert_eq!(ids, vec![monthly.id, march.id]);
        assert_eq!(state.calendar.current_month().await, 3);
    }

    #[tokio::test]
    async fn refresh_is_idempotent_for_unchanged_data() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let batch = state
            .db
            .save_batch(&batch_payload(2, 2).normalized().unwrap())
            .await
            .unwrap();
        state.db.save_stt(&old_stt("SKU-1", batch.id)).await.unwrap();
        state.db.save_stt(&new_stt("SKU-2", 4, 2)).await.unwrap();

        let first = state.calendar.refresh(&state.db, 4).await;
        let second = state.calendar.refresh(&state.db, 4).await;
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn set_month_never_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        state.db.save_stt(&new_stt("SKU-1", 1, 1)).await.unwrap();
        assert_eq!(state.calendar.state().await, ViewState::Loading);

        let due = state.calendar.refresh(&state.db, 5).await;
        assert_eq!(due.len(), 1);
        assert_eq!(state.calendar.state().await, ViewState::Ready);

        // a record created after the refresh is invisible until the next one
        state.db.save_stt(&new_stt("SKU-2", 1, 1)).await.unwrap();
        let due = state.calendar.set_month(6).await;
        assert_eq!(due.len(), 1);

        let due = state.calendar.refresh(&state.db, 6).await;
        assert_eq!(due.len(), 2);
    }

    #[tokio::test]
    async fn annotations_show_up_on_merged_entries() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let record = state.db.save_stt(&new_stt("SKU-1", 1, 1)).await.unwrap();
        let when = chrono::NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        state.db.save_annotation(record.id, 6, when).await.unwrap();

        let due = state.calendar.refresh(&state.db, 6).await;
        assert_eq!(due[0].scheduled_at, Some(when));

        // the annotation is month-scoped
        let due = state.calendar.refresh(&state.db, 7).await;
        assert_eq!(due[0].scheduled_at, None);
    }
}
