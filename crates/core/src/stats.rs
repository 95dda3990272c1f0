use std::sync::Arc;

use tracing::{debug, error};

use crate::error::ServiceError;
use crate::store::{ApplicationStore, CountPredicate};
use crate::types::{MonthlyCount, Summary, STATUS_INTERVIEW_SCHEDULED, STATUS_OFFER_RECEIVED};

const REMOTE_NEEDLE: &str = "remote";
const HOUSTON_NEEDLE: &str = "houston";

/// Computes dashboard statistics from independent store queries.
pub struct StatisticsService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> StatisticsService<S>
where
    S: ApplicationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Runs the five summary counts concurrently.
    ///
    /// The first failing query aborts the others and the whole summary fails;
    /// partial results are never returned.
    pub async fn compute_summary(&self) -> Result<Summary, ServiceError> {
        let submitted = CountPredicate::Submitted;
        let interview = CountPredicate::StatusEquals(STATUS_INTERVIEW_SCHEDULED.to_string());
        let offer = CountPredicate::StatusEquals(STATUS_OFFER_RECEIVED.to_string());
        let remote = CountPredicate::LocationContains(REMOTE_NEEDLE.to_string());
        let houston = CountPredicate::LocationContains(HOUSTON_NEEDLE.to_string());

        let joined = tokio::try_join!(
            self.count("submitted_count", &submitted),
            self.count("interview_count", &interview),
            self.count("offer_count", &offer),
            self.count("remote_count", &remote),
            self.count("houston_count", &houston),
        );

        match joined {
            Ok((submitted_count, interview_count, offer_count, remote_count, houston_count)) => {
                let summary = Summary {
                    submitted_count,
                    interview_count,
                    offer_count,
                    remote_count,
                    houston_count,
                };
                debug!(stage = "stats", ?summary, "computed summary");
                Ok(summary)
            }
            Err(err) => {
                error!(stage = "stats", error = %err, "summary aggregation failed");
                Err(err)
            }
        }
    }

    /// Submission counts per calendar month, skipping undated records.
    ///
    /// Buckets come back in whatever order the store yields them.
    pub async fn compute_monthly_histogram(&self) -> Result<Vec<MonthlyCount>, ServiceError> {
        let buckets = self.store.group_by_submission_month().await.map_err(|err| {
            error!(stage = "stats", error = %err, "monthly histogram query failed");
            ServiceError::from(err)
        })?;
        debug!(stage = "stats", buckets = buckets.len(), "computed monthly histogram");
        Ok(buckets)
    }

    async fn count(
        &self,
        query: &'static str,
        predicate: &CountPredicate,
    ) -> Result<u64, ServiceError> {
        self.store
            .count(predicate)
            .await
            .map_err(|source| ServiceError::Aggregation { query, source })
    }
}
