use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{ApplicationStore, CountPredicate};
use crate::types::{ApplicationFields, ApplicationId, ApplicationRecord, MonthlyCount};

/// Process-local record store used by tests and ephemeral deployments.
///
/// Records are returned in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    records: BTreeMap<u64, ApplicationRecord>,
}

impl Inner {
    fn position(&self, id: &ApplicationId) -> Option<u64> {
        self.records
            .iter()
            .find_map(|(seq, record)| (record.id == *id).then_some(*seq))
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn create(&self, fields: ApplicationFields) -> Result<ApplicationRecord, StoreError> {
        let mut inner = self.lock()?;
        let id = ApplicationId(Uuid::new_v4().to_string());
        let record = ApplicationRecord::from_fields(id, fields);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.records.insert(seq, record.clone());
        Ok(record)
    }

    async fn get_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.records.values().find(|record| record.id == *id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.records.values().cloned().collect())
    }

    async fn update_by_id(
        &self,
        id: &ApplicationId,
        fields: ApplicationFields,
    ) -> Result<Option<ApplicationRecord>, StoreError> {
        let mut inner = self.lock()?;
        let Some(seq) = inner.position(id) else {
            return Ok(None);
        };
        let updated = inner.records.get_mut(&seq).map(|record| {
            record.replace_fields(fields);
            record.clone()
        });
        Ok(updated)
    }

    async fn delete_by_id(&self, id: &ApplicationId) -> Result<Option<ApplicationId>, StoreError> {
        let mut inner = self.lock()?;
        let Some(seq) = inner.position(id) else {
            return Ok(None);
        };
        Ok(inner.records.remove(&seq).map(|record| record.id))
    }

    async fn count(&self, predicate: &CountPredicate) -> Result<u64, StoreError> {
        let inner = self.lock()?;
        let count = inner
            .records
            .values()
            .filter(|record| predicate.matches(record))
            .count();
        Ok(count as u64)
    }

    async fn group_by_submission_month(&self) -> Result<Vec<MonthlyCount>, StoreError> {
        let inner = self.lock()?;
        let mut buckets: BTreeMap<(i32, u32), u64> = BTreeMap::new();
        for (year, month) in inner
            .records
            .values()
            .filter_map(ApplicationRecord::submission_month)
        {
            *buckets.entry((year, month)).or_default() += 1;
        }
        Ok(buckets
            .into_iter()
            .map(|((year, month), count)| MonthlyCount { year, month, count })
            .collect())
    }
}
