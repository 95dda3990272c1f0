use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::error::ServiceError;
use crate::store::ApplicationStore;
use crate::types::ApplicationRecord;

/// Produces the caller-facing ordering of all application records.
pub struct ListingService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ListingService<S>
where
    S: ApplicationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Lists every record, most recently submitted first.
    ///
    /// Records without a submission date are still pending and sort ahead of
    /// every dated record.
    pub async fn list_all(&self) -> Result<Vec<ApplicationRecord>, ServiceError> {
        let mut records = self.store.get_all().await?;
        sort_newest_first(&mut records);
        debug!(stage = "listing", count = records.len(), "listed applications");
        Ok(records)
    }
}

/// Stable sort by submission date, descending, with undated records first.
pub fn sort_newest_first(records: &mut [ApplicationRecord]) {
    records.sort_by(newest_first);
}

fn newest_first(a: &ApplicationRecord, b: &ApplicationRecord) -> Ordering {
    match (a.date_submitted, b.date_submitted) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => right.cmp(&left),
    }
}
