use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::ServiceError;
use crate::listing::ListingService;
use crate::mutation::MutationService;
use crate::stats::StatisticsService;
use crate::store::ApplicationStore;
use crate::timeline::{build_timeline, TimelineEntry};
use crate::types::{ApplicationId, ApplicationInput, ApplicationRecord, MonthlyCount, Summary};

/// Single entry point over one injected record store.
pub struct ApplicationService<S: ?Sized> {
    store: Arc<S>,
    listing: ListingService<S>,
    statistics: StatisticsService<S>,
    mutation: MutationService<S>,
}

impl<S> ApplicationService<S>
where
    S: ApplicationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            listing: ListingService::new(store.clone()),
            statistics: StatisticsService::new(store.clone()),
            mutation: MutationService::new(store.clone()),
            store,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<ApplicationRecord>, ServiceError> {
        self.listing.list_all().await
    }

    pub async fn get_by_id(&self, id: &ApplicationId) -> Result<ApplicationRecord, ServiceError> {
        self.store.get_by_id(id).await?.ok_or_else(|| {
            warn!(stage = "listing", %id, "lookup of unknown application");
            ServiceError::not_found(id)
        })
    }

    pub async fn compute_summary(&self) -> Result<Summary, ServiceError> {
        self.statistics.compute_summary().await
    }

    pub async fn compute_monthly_histogram(&self) -> Result<Vec<MonthlyCount>, ServiceError> {
        self.statistics.compute_monthly_histogram().await
    }

    pub async fn create_application(
        &self,
        input: ApplicationInput,
    ) -> Result<ApplicationRecord, ServiceError> {
        self.mutation.create_application(input).await
    }

    pub async fn update_application(
        &self,
        id: &ApplicationId,
        input: ApplicationInput,
    ) -> Result<ApplicationRecord, ServiceError> {
        self.mutation.update_application(id, input).await
    }

    pub async fn delete_application(
        &self,
        id: &ApplicationId,
    ) -> Result<ApplicationId, ServiceError> {
        self.mutation.delete_application(id).await
    }

    pub fn build_timeline(&self, dates: &[Option<DateTime<Utc>>]) -> Vec<TimelineEntry> {
        build_timeline(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::InMemoryStore;

    #[tokio::test]
    async fn works_over_a_trait_object_store() {
        let store: Arc<dyn ApplicationStore> = Arc::new(InMemoryStore::new());
        let service = ApplicationService::new(store);

        let created = service
            .create_application(ApplicationInput {
                company: Some("Initech".into()),
                position: Some("SRE".into()),
                location: Some("Remote".into()),
                status: Some("Offer Received".into()),
                ..Default::default()
            })
            .await
            .expect("create");

        let fetched = service.get_by_id(&created.id).await.expect("get");
        assert_eq!(fetched, created);

        let summary = service.compute_summary().await.expect("summary");
        assert_eq!(summary.offer_count, 1);
        assert_eq!(summary.remote_count, 1);
        assert_eq!(summary.submitted_count, 0);

        let err = service.get_by_id(&"missing".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(service.build_timeline(&[]).len(), 7);
    }
}
