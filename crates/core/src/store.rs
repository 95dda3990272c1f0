use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{ApplicationFields, ApplicationId, ApplicationRecord, MonthlyCount};

/// Filters the record store can count without materializing records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountPredicate {
    /// Records with a submission date.
    Submitted,
    /// Records whose status equals the value exactly.
    StatusEquals(String),
    /// Records whose location contains the needle, ignoring ASCII case.
    ///
    /// Non-ASCII letters compare exactly, matching SQLite's `lower()`.
    LocationContains(String),
}

impl CountPredicate {
    /// Evaluates the predicate against a single record.
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        match self {
            Self::Submitted => record.date_submitted.is_some(),
            Self::StatusEquals(status) => record.status == *status,
            Self::LocationContains(needle) => record
                .location
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

/// Persistence boundary for application records.
///
/// Absence is reported as `Ok(None)`; the services decide whether that is an
/// error for the caller. Implementations own id assignment.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn create(&self, fields: ApplicationFields) -> Result<ApplicationRecord, StoreError>;

    async fn get_by_id(&self, id: &ApplicationId)
        -> Result<Option<ApplicationRecord>, StoreError>;

    /// Returns every record in no particular order.
    async fn get_all(&self) -> Result<Vec<ApplicationRecord>, StoreError>;

    /// Replaces all fields of an existing record and returns its new state.
    async fn update_by_id(
        &self,
        id: &ApplicationId,
        fields: ApplicationFields,
    ) -> Result<Option<ApplicationRecord>, StoreError>;

    async fn delete_by_id(&self, id: &ApplicationId) -> Result<Option<ApplicationId>, StoreError>;

    async fn count(&self, predicate: &CountPredicate) -> Result<u64, StoreError>;

    /// Groups records with a submission date by calendar month.
    async fn group_by_submission_month(&self) -> Result<Vec<MonthlyCount>, StoreError>;
}
