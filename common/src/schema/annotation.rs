use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Display-only note that a calendar card was scheduled by hand. Nothing
/// is dispatched from these; they only annotate the month view.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduleAnnotation {
    pub id: i64,
    pub object_id: i64,
    pub month: i64,
    pub scheduled_at: NaiveDateTime,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAnnotation {
    pub object_id: i64,
    pub datetime: String,
    pub month: i64,
}

impl NewAnnotation {
    /// Parses the `datetime` field, accepting the browser `datetime-local`
    /// form (no seconds) as well as full ISO timestamps.
    pub fn scheduled_at(&self) -> anyhow::Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.datetime, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(&self.datetime, "%Y-%m-%dT%H:%M"))
            .map_err(|_| anyhow!("datetime must look like 2025-01-31T14:30"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=12).contains(&self.month) {
            return Err(anyhow!("month must be between 1 and 12"));
        }
        self.scheduled_at().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn parses_datetime_local_without_seconds() {
        let annotation = NewAnnotation {
            object_id: 1,
            datetime: "2025-03-07T09:15".into(),
            month: 3,
        };
        let parsed = annotation.scheduled_at().unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2025, 3, 7)
                .unwrap()
                .and_time(NaiveTime::from_hms_opt(9, 15, 0).unwrap())
        );
        annotation.validate().unwrap();
    }

    #[test]
    fn rejects_garbage_datetime_and_bad_month() {
        let annotation = NewAnnotation {
            object_id: 1,
            datetime: "soon".into(),
            month: 3,
        };
        assert!(annotation.validate().is_err());

        let annotation = NewAnnotation {
            object_id: 1,
            datetime: "2025-03-07T09:15".into(),
            month: 0,
        };
        assert!(annotation.validate().is_err());
    }
}
