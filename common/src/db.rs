use std::str::FromStr;

use anyhow::Context;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use crate::schema::{
    BatchFields, BulkBatchResult, BulkLookupError, EntryType, NewStt, ScheduleAnnotation,
    SttBatch, SttRecord, SttUpdate, User,
};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to parse SQLite connect options")?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to the database")?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    pub async fn save_stt(&self, new_stt: &NewStt) -> anyhow::Result<SttRecord> {
        let now = Utc::now().naive_utc();
        // An entry only stores the fields its entry type owns; batch-backed
        // entries get their recurrence fields merged in at view time.
        let (frequency, month_start, send_to, send_to_type, invoice_to, invoice_to_type) =
            match new_stt.entry_type {
                EntryType::New => (
                    new_stt.frequency,
                    new_stt.month_start,
                    new_stt.send_to.clone(),
                    new_stt.send_to_type,
                    new_stt.invoice_to.clone(),
                    new_stt.invoice_to_type,
                ),
                EntryType::Old => (None, None, None, None, None, None),
            };
        let stt_batch_id = match new_stt.entry_type {
            EntryType::New => None,
            EntryType::Old => new_stt.stt_batch_id,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO stt (
                machine_sku, machine_name, entry_type, frequency, month_start,
                send_to, send_to_type, invoice_to, invoice_to_type,
                stt_batch_id, stt_notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_stt.machine_sku)
        .bind(&new_stt.machine_name)
        .bind(new_stt.entry_type)
        .bind(frequency)
        .bind(month_start)
        .bind(send_to)
        .bind(send_to_type)
        .bind(invoice_to)
        .bind(invoice_to_type)
        .bind(stt_batch_id)
        .bind(new_stt.stt_notes.clone().unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save STT entry to database")?;

        let id = result.last_insert_rowid();
        self.get_stt(id)
            .await?
            .context("Saved STT entry could not be read back")
    }

    pub async fn get_stt(&self, id: i64) -> anyhow::Result<Option<SttRecord>> {
        let record = sqlx::query_as::<_, SttRecord>(
            r#"
            SELECT * FROM stt WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to get STT entry with id {id}"))?;
        Ok(record)
    }

    /// All live entries, newest first. Same-second inserts are ordered by
    /// id so the listing stays deterministic.
    pub async fn get_stt_list(&self) -> anyhow::Result<Vec<SttRecord>> {
        let records = sqlx::query_as::<_, SttRecord>(
            r#"
            SELECT * FROM stt WHERE deleted = 0 ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to get STT entries from database")?;
        Ok(records)
    }

    pub async fn update_stt(
        &self,
        id: i64,
        update: &SttUpdate,
    ) -> anyhow::Result<Option<SttRecord>> {
        let Some(mut record) = self.get_stt(id).await? else {
            return Ok(None);
        };
        update.apply(&mut record);
        record.updated_at = Some(Utc::now().naive_utc());

        sqlx::query(
            r#"
            UPDATE stt
            SET machine_sku = ?, machine_name = ?, entry_type = ?, frequency = ?,
                month_start = ?, send_to = ?, send_to_type = ?, invoice_to = ?,
                invoice_to_type = ?, stt_batch_id = ?, stt_notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.machine_sku)
        .bind(&record.machine_name)
        .bind(record.entry_type)
        .bind(record.frequency)
        .bind(record.month_start)
        .bind(&record.send_to)
        .bind(record.send_to_type)
        .bind(&record.invoice_to)
        .bind(record.invoice_to_type)
        .bind(record.stt_batch_id)
        .bind(&record.stt_notes)
        .bind(record.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update STT entry with id {id}"))?;

        Ok(Some(record))
    }

    pub async fn soft_delete_stt(&self, id: i64) -> anyhow::Result<bool> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE stt SET deleted = 1, deleted_at = ?, updated_at = ? WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to soft delete STT entry with id {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn save_batch(&self, fields: &BatchFields) -> anyhow::Result<SttBatch> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            INSERT INTO stt_batches (
                company_name, frequency, month_start, send_to, send_to_type,
                invoice_to, invoice_to_type, stt_batch_notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.company_name)
        .bind(fields.frequency)
        .bind(fields.month_start)
        .bind(&fields.send_to)
        .bind(fields.send_to_type)
        .bind(&fields.invoice_to)
        .bind(fields.invoice_to_type)
        .bind(&fields.stt_batch_notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save STT batch to database")?;

        let id = result.last_insert_rowid();
        self.get_batch(id)
            .await?
            .context("Saved STT batch could not be read back")
    }

    pub async fn get_batch(&self, id: i64) -> anyhow::Result<Option<SttBatch>> {
        let batch = sqlx::query_as::<_, SttBatch>(
            r#"
            SELECT * FROM stt_batches WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to get STT batch with id {id}"))?;
        Ok(batch)
    }

    pub async fn get_batch_list(&self) -> anyhow::Result<Vec<SttBatch>> {
        let batches = sqlx::query_as::<_, SttBatch>(
            r#"
            SELECT * FROM stt_batches WHERE deleted = 0 ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to get STT batches from database")?;
        Ok(batches)
    }

    /// Looks up several batches at once. Each id resolves independently:
    /// missing or deleted batches become `errors` entries while the rest
    /// of the ids still resolve.
    pub async fn get_batches_by_ids(&self, ids: &[i64]) -> anyhow::Result<BulkBatchResult> {
        let mut outcome = BulkBatchResult::default();
        for &id in ids {
            match self.get_batch(id).await {
                Ok(Some(batch)) => outcome.results.push(batch),
                Ok(None) => outcome.errors.push(BulkLookupError {
                    id: id.to_string(),
                    message: "STT batch entry not found or is deleted".to_string(),
                }),
                Err(e) => {
                    log::error!("Batch lookup failed for id {id}: {e:#}");
                    outcome.errors.push(BulkLookupError {
                        id: id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    pub async fn update_batch(
        &self,
        id: i64,
        fields: &BatchFields,
    ) -> anyhow::Result<Option<SttBatch>> {
        if self.get_batch(id).await?.is_none() {
            return Ok(None);
        }
        sqlx::query(
            r#"
            UPDATE stt_batches
            SET company_name = ?, frequency = ?, month_start = ?, send_to = ?,
                send_to_type = ?, invoice_to = ?, invoice_to_type = ?,
                stt_batch_notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.company_name)
        .bind(fields.frequency)
        .bind(fields.month_start)
        .bind(&fields.send_to)
        .bind(fields.send_to_type)
        .bind(&fields.invoice_to)
        .bind(fields.invoice_to_type)
        .bind(&fields.stt_batch_notes)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update STT batch with id {id}"))?;
        self.get_batch(id).await
    }

    pub async fn soft_delete_batch(&self, id: i64) -> anyhow::Result<bool> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE stt_batches
            SET deleted = 1, deleted_at = ?, updated_at = ?
            WHERE id = ? AND deleted = 0
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to soft delete STT batch with id {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn save_user(&self, user: &User) -> anyhow::Result<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, is_superuser, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_superuser)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save user to database")?;
        Ok(())
    }

    pub async fn get_user(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to get user with username {username}"))?;
        Ok(user)
    }

    pub async fn save_annotation(
        &self,
        object_id: i64,
        month: i64,
        scheduled_at: chrono::NaiveDateTime,
    ) -> anyhow::Result<ScheduleAnnotation> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            INSERT INTO schedule_annotations (object_id, month, scheduled_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(object_id)
        .bind(month)
        .bind(scheduled_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save schedule annotation")?;

        Ok(ScheduleAnnotation {
            id: result.last_insert_rowid(),
            object_id,
            month,
            scheduled_at,
            created_at: Some(now),
        })
    }

    /// Annotations for one calendar month, oldest first, so a map built by
    /// insertion order keeps the most recent value per object.
    pub async fn get_annotations_for_month(
        &self,
        month: u32,
    ) -> anyhow::Result<Vec<ScheduleAnnotation>> {
        let annotations = sqlx::query_as::<_, ScheduleAnnotation>(
            r#"
            SELECT * FROM schedule_annotations WHERE month = ? ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(month as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get schedule annotations")?;
        Ok(annotations)
    }

    pub async fn count_stt(&self) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stt")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count STT entries")?;
        Ok(count)
    }

    pub async fn count_batches(&self) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stt_batches")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count STT batches")?;
        Ok(count)
    }
}
