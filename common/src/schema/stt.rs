use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Discriminator for how an STT entry gets its recurrence fields: a `new`
/// entry carries them itself, an `old` entry inherits them from the batch
/// it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EntryType {
    New,
    Old,
}

/// How a destination cell should be interpreted: a Maropost customer id,
/// a literal email address, or a free-form reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RecipientType {
    MaropostId,
    Email,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SttRecord {
    pub id: i64,
    pub machine_sku: String,
    pub machine_name: String,
    pub entry_type: EntryType,
    pub frequency: Option<i64>,
    pub month_start: Option<i64>,
    pub send_to: Option<String>,
    pub send_to_type: Option<RecipientType>,
    pub invoice_to: Option<String>,
    pub invoice_to_type: Option<RecipientType>,
    pub stt_batch_id: Option<i64>,
    pub stt_notes: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted: bool,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Creation payload for an STT entry. Which fields are required depends on
/// `entry_type`; `validate` enforces that split before anything is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStt {
    pub machine_sku: String,
    pub machine_name: String,
    pub entry_type: EntryType,
    #[serde(default)]
    pub frequency: Option<i64>,
    #[serde(default)]
    pub month_start: Option<i64>,
    #[serde(default)]
    pub send_to: Option<String>,
    #[serde(default)]
    pub send_to_type: Option<RecipientType>,
    #[serde(default)]
    pub invoice_to: Option<String>,
    #[serde(default)]
    pub invoice_to_type: Option<RecipientType>,
    #[serde(default)]
    pub stt_batch_id: Option<i64>,
    #[serde(default)]
    pub stt_notes: Option<String>,
}

impl NewStt {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.entry_type {
            EntryType::New => {
                let mut missing = Vec::new();
                if self.frequency.is_none() {
                    missing.push("frequency");
                }
                if self.month_start.is_none() {
                    missing.push("month_start");
                }
                if self.send_to.as_deref().unwrap_or("").trim().is_empty() {
                    missing.push("send_to");
                }
                if self.send_to_type.is_none() {
                    missing.push("send_to_type");
                }
                if self.invoice_to.as_deref().unwrap_or("").trim().is_empty() {
                    missing.push("invoice_to");
                }
                if self.invoice_to_type.is_none() {
                    missing.push("invoice_to_type");
                }
                if !missing.is_empty() {
                    return Err(anyhow!("Missing required fields: {}", missing.join(", ")));
                }
                if self.frequency.is_some_and(|f| f < 1) {
                    return Err(anyhow!("frequency must be a positive number of months"));
                }
                if self.month_start.is_some_and(|m| !(1..=12).contains(&m)) {
                    return Err(anyhow!("month_start must be between 1 and 12"));
                }
                if self.send_to_type == Some(RecipientType::Other) {
                    return Err(anyhow!("send_to_type must be 'maropost_id' or 'email'"));
                }
                Ok(())
            }
            EntryType::Old => {
                if self.stt_batch_id.is_none() {
                    return Err(anyhow!("Missing required fields: stt_batch_id"));
                }
                Ok(())
            }
        }
    }
}

/// Partial update for an STT entry; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SttUpdate {
    #[serde(default)]
    pub machine_sku: Option<String>,
    #[serde(default)]
    pub machine_name: Option<String>,
    #[serde(default)]
    pub entry_type: Option<EntryType>,
    #[serde(default)]
    pub frequency: Option<i64>,
    #[serde(default)]
    pub month_start: Option<i64>,
    #[serde(default)]
    pub send_to: Option<String>,
    #[serde(default)]
    pub send_to_type: Option<RecipientType>,
    #[serde(default)]
    pub invoice_to: Option<String>,
    #[serde(default)]
    pub invoice_to_type: Option<RecipientType>,
    #[serde(default)]
    pub stt_batch_id: Option<i64>,
    #[serde(default)]
    pub stt_notes: Option<String>,
}

impl SttUpdate {
    pub fn apply(&self, record: &mut SttRecord) {
        if let Some(machine_sku) = &self.machine_sku {
            record.machine_sku = machine_sku.clone();
        }
        if let Some(machine_name) = &self.machine_name {
            record.machine_name = machine_name.clone();
        }
        if let Some(entry_type) = self.entry_type {
            record.entry_type = entry_type;
        }
        if let Some(frequency) = self.frequency {
            record.frequency = Some(frequency);
        }
        if let Some(month_start) = self.month_start {
            record.month_start = Some(month_start);
        }
        if let Some(send_to) = &self.send_to {
            record.send_to = Some(send_to.clone());
        }
        if let Some(send_to_type) = self.send_to_type {
            record.send_to_type = Some(send_to_type);
        }
        if let Some(invoice_to) = &self.invoice_to {
            record.invoice_to = Some(invoice_to.clone());
        }
        if let Some(invoice_to_type) = self.invoice_to_type {
            record.invoice_to_type = Some(invoice_to_type);
        }
        if let Some(stt_batch_id) = self.stt_batch_id {
            record.stt_batch_id = Some(stt_batch_id);
        }
        if let Some(stt_notes) = &self.stt_notes {
            record.stt_notes = stt_notes.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry() -> NewStt {
        NewStt {
            machine_sku: "SKU-100".into(),
            machine_name: "Press 100".into(),
            entry_type: EntryType::New,
            frequency: Some(3),
            month_start: Some(2),
            send_to: Some("ops@example.com".into()),
            send_to_type: Some(RecipientType::Email),
            invoice_to: Some("billing@example.com".into()),
            invoice_to_type: Some(RecipientType::Email),
            stt_batch_id: None,
            stt_notes: None,
        }
    }

    #[test]
    fn new_entry_with_all_fields_passes() {
        new_entry().validate().unwrap();
    }

    #[test]
    fn new_entry_missing_recurrence_fields_fails() {
        let mut stt = new_entry();
        stt.frequency = None;
        stt.month_start = None;
        let err = new_entry_err(&stt);
        assert!(err.contains("frequency"));
        assert!(err.contains("month_start"));
    }

    #[test]
    fn new_entry_rejects_non_positive_frequency() {
        let mut stt = new_entry();
        stt.frequency = Some(0);
        assert!(stt.validate().is_err());
        stt.frequency = Some(-4);
        assert!(stt.validate().is_err());
    }

    #[test]
    fn new_entry_rejects_out_of_range_month() {
        let mut stt = new_entry();
        stt.month_start = Some(13);
        assert!(stt.validate().is_err());
    }

    #[test]
    fn old_entry_requires_batch_reference() {
        let mut stt = new_entry();
        stt.entry_type = EntryType::Old;
        stt.stt_batch_id = None;
        assert!(stt.validate().is_err());
        stt.stt_batch_id = Some(7);
        stt.validate().unwrap();
    }

    #[test]
    fn recipient_type_uses_wire_names_and_rejects_unknowns() {
        let parsed: RecipientType = serde_json::from_str("\"maropost_id\"").unwrap();
        assert_eq!(parsed, RecipientType::MaropostId);
        let parsed: RecipientType = serde_json::from_str("\"other\"").unwrap();
        assert_eq!(parsed, RecipientType::Other);
        assert!(serde_json::from_str::<RecipientType>("\"account_ref\"").is_err());
    }

    fn new_entry_err(stt: &NewStt) -> String {
        stt.validate().unwrap_err().to_string()
    }
}
