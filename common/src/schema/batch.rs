use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::schema::stt::RecipientType;

/// Shared recurrence/destination template referenced by `old` STT entries.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SttBatch {
    pub id: i64,
    pub company_name: String,
    pub frequency: i64,
    pub month_start: i64,
    pub send_to: String,
    pub send_to_type: RecipientType,
    pub invoice_to: String,
    pub invoice_to_type: RecipientType,
    pub stt_batch_notes: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Creation/update payload for a batch. All fields are optional at the
/// serde layer so per-field problems can be reported back; `normalized`
/// is the gate that turns a payload into storable values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub send_to_type: Option<RecipientType>,
    #[serde(default)]
    pub invoice_to_type: Option<RecipientType>,
    #[serde(default)]
    pub send_to: Option<String>,
    #[serde(default)]
    pub invoice_to: Option<String>,
    #[serde(default)]
    pub frequency: Option<i64>,
    #[serde(default)]
    pub stt_batch_notes: Option<String>,
    #[serde(default)]
    pub month_start: Option<i64>,
}

/// Validated batch fields ready for storage.
#[derive(Debug, Clone)]
pub struct BatchFields {
    pub company_name: String,
    pub frequency: i64,
    pub month_start: i64,
    pub send_to: String,
    pub send_to_type: RecipientType,
    pub invoice_to: String,
    pub invoice_to_type: RecipientType,
    pub stt_batch_notes: String,
}

impl NewBatch {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.company_name.as_deref().unwrap_or("").trim().is_empty() {
            missing.push("company_name");
        }
        if self.send_to.as_deref().unwrap_or("").trim().is_empty() {
            missing.push("send_to");
        }
        if self.invoice_to.as_deref().unwrap_or("").trim().is_empty() {
            missing.push("invoice_to");
        }
        if self.send_to_type.is_none() {
            missing.push("send_to_type");
        }
        if self.invoice_to_type.is_none() {
            missing.push("invoice_to_type");
        }
        if self.frequency.is_none() {
            missing.push("frequency");
        }
        if self.month_start.is_none() {
            missing.push("month_start");
        }
        missing
    }

    pub fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        if self.frequency.is_some_and(|f| f < 1) {
            invalid.push("frequency");
        }
        if self.month_start.is_some_and(|m| !(1..=12).contains(&m)) {
            invalid.push("month_start");
        }
        if self.send_to_type == Some(RecipientType::Other) {
            invalid.push("send_to_type");
        }
        invalid
    }

    pub fn normalized(&self) -> anyhow::Result<BatchFields> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(anyhow!("Missing required fields: {}", missing.join(", ")));
        }
        let invalid = self.invalid_fields();
        if !invalid.is_empty() {
            return Err(anyhow!("Invalid field values: {}", invalid.join(", ")));
        }
        Ok(BatchFields {
            company_name: self.company_name.clone().unwrap_or_default().trim().to_string(),
            frequency: self.frequency.unwrap_or_default(),
            month_start: self.month_start.unwrap_or_default(),
            send_to: first_token(self.send_to.as_deref().unwrap_or_default()),
            send_to_type: self.send_to_type.unwrap_or(RecipientType::Email),
            invoice_to: first_token(self.invoice_to.as_deref().unwrap_or_default()),
            invoice_to_type: self.invoice_to_type.unwrap_or(RecipientType::Email),
            stt_batch_notes: self.stt_batch_notes.clone().unwrap_or_default(),
        })
    }
}

/// Destination cells sometimes arrive as comma-joined lists from the
/// customer picker; only the first entry is meaningful.
fn first_token(value: &str) -> String {
    value.split(',').next().unwrap_or_default().trim().to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkLookupError {
    pub id: String,
    pub message: String,
}

/// Outcome of looking up several batch ids at once. Per-id failures land
/// in `errors`; the lookup itself only fails on a storage-level fault.
#[derive(Debug, Default)]
pub struct BulkBatchResult {
    pub results: Vec<SttBatch>,
    pub errors: Vec<BulkLookupError>,
}

#[derive(Debug, Serialize)]
pub struct BulkBatchResponse {
    pub success: bool,
    pub total_requested: usize,
    pub total_found: usize,
    pub results: Vec<SttBatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<BulkLookupError>>,
}

#[derive(Debug, Serialize)]
pub struct BatchCreateError {
    pub index: usize,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub success: bool,
    pub total_submitted: usize,
    pub total_created: usize,
    pub total_failed: usize,
    pub created_batches: Vec<SttBatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<BatchCreateError>>,
}
