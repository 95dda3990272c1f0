use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::timeline::TimelineEntry;

/// Status value counted as an upcoming interview.
pub const STATUS_INTERVIEW_SCHEDULED: &str = "Interview Scheduled";
/// Status value counted as an offer.
pub const STATUS_OFFER_RECEIVED: &str = "Offer Received";

/// Store-assigned identifier of an application record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApplicationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ApplicationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A tracked job application as persisted by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub company: String,
    pub position: String,
    pub location: String,
    pub status: String,
    #[serde(default)]
    pub date_submitted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<TimelineEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ApplicationRecord {
    /// Materializes a record from validated fields and the id the store assigned.
    pub fn from_fields(id: ApplicationId, fields: ApplicationFields) -> Self {
        Self {
            id,
            company: fields.company,
            position: fields.position,
            location: fields.location,
            status: fields.status,
            date_submitted: fields.date_submitted,
            next_due: fields.next_due,
            history: fields.history,
            notes: fields.notes,
            link: fields.link,
        }
    }

    /// Replaces every mutable field, keeping the identifier.
    pub fn replace_fields(&mut self, fields: ApplicationFields) {
        let id = self.id.clone();
        *self = Self::from_fields(id, fields);
    }

    /// Calendar bucket of the submission date, if the application was submitted.
    pub fn submission_month(&self) -> Option<(i32, u32)> {
        self.date_submitted.map(|at| (at.year(), at.month()))
    }
}

/// Caller-supplied payload for creating or replacing an application.
///
/// Every field is optional at this layer so that missing required values
/// surface as validation errors instead of decode errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date_submitted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Option<Vec<TimelineEntry>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Validated, trimmed field set handed to the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFields {
    pub company: String,
    pub position: String,
    pub location: String,
    pub status: String,
    pub date_submitted: Option<DateTime<Utc>>,
    pub next_due: Option<DateTime<Utc>>,
    pub history: Vec<TimelineEntry>,
    pub notes: Option<String>,
    pub link: Option<String>,
}

impl TryFrom<ApplicationInput> for ApplicationFields {
    type Error = ServiceError;

    fn try_from(input: ApplicationInput) -> Result<Self, Self::Error> {
        let company = required("company", input.company)?;
        let position = required("position", input.position)?;
        let location = required("location", input.location)?;
        let status = required("status", input.status)?;

        let history = input.history.unwrap_or_default();
        let history = history
            .into_iter()
            .map(|entry| {
                let activity = entry.activity.trim();
                if activity.is_empty() {
                    return Err(ServiceError::Validation { field: "history" });
                }
                Ok(TimelineEntry::new(activity, entry.date))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            company,
            position,
            location,
            status,
            date_submitted: input.date_submitted,
            next_due: input.next_due,
            history,
            notes: optional(input.notes),
            link: optional(input.link),
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ServiceError> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ServiceError::Validation { field }),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

/// Headline counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub submitted_count: u64,
    /// Counts every application whose status is "Interview Scheduled",
    /// whether the interview is still ahead or already past.
    pub interview_count: u64,
    pub offer_count: u64,
    pub remote_count: u64,
    pub houston_count: u64,
}

/// Number of applications submitted in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    fn input() -> ApplicationInput {
        ApplicationInput {
            company: Some("  Acme ".into()),
            position: Some("Backend Engineer".into()),
            location: Some("Remote".into()),
            status: Some("Applied".into()),
            ..Default::default()
        }
    }

    #[test]
    fn trims_required_fields() {
        let fields = ApplicationFields::try_from(input()).expect("valid input");
        assert_eq!(fields.company, "Acme");
        assert!(fields.history.is_empty());
    }

    #[test]
    fn rejects_blank_or_missing_required_fields() {
        let mut blank = input();
        blank.position = Some("   ".into());
        let err = ApplicationFields::try_from(blank).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err, ServiceError::Validation { field: "position" }));

        let mut missing = input();
        missing.status = None;
        let err = ApplicationFields::try_from(missing).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "status" }));
    }

    #[test]
    fn blank_optional_text_becomes_absent() {
        let mut raw = input();
        raw.notes = Some("  ".into());
        raw.link = Some(" https://acme.example/jobs/1 ".into());
        let fields = ApplicationFields::try_from(raw).expect("valid input");
        assert_eq!(fields.notes, None);
        assert_eq!(fields.link.as_deref(), Some("https://acme.example/jobs/1"));
    }

    #[test]
    fn rejects_history_entry_without_activity() {
        let mut raw = input();
        raw.history = Some(vec![TimelineEntry::new(" ", None)]);
        let err = ApplicationFields::try_from(raw).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "history" }));
    }

    #[test]
    fn record_uses_camel_case_wire_names() {
        let submitted = Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap();
        let mut fields = ApplicationFields::try_from(input()).expect("valid input");
        fields.date_submitted = Some(submitted);
        let record = ApplicationRecord::from_fields(ApplicationId::from("app-1"), fields);

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["id"], "app-1");
        assert_eq!(value["dateSubmitted"], "2024-05-14T12:00:00Z");
        assert!(value["nextDue"].is_null());
        assert!(value.get("notes").is_none());
        assert_eq!(record.submission_month(), Some((2024, 5)));
    }

    #[test]
    fn summary_serializes_named_counts() {
        let summary = Summary {
            submitted_count: 4,
            offer_count: 1,
            ..Summary::default()
        };
        let value = serde_json::to_value(summary).expect("serialize");
        assert_eq!(value["submittedCount"], 4);
        assert_eq!(value["offerCount"], 1);
        assert_eq!(value["houstonCount"], 0);
    }
}
