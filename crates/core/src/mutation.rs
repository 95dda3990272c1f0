use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::store::ApplicationStore;
use crate::types::{ApplicationFields, ApplicationId, ApplicationInput, ApplicationRecord};

/// Validates and applies create, replace, and delete operations.
pub struct MutationService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> MutationService<S>
where
    S: ApplicationStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validates the input and persists a new record.
    pub async fn create_application(
        &self,
        input: ApplicationInput,
    ) -> Result<ApplicationRecord, ServiceError> {
        let fields = validate(input)?;
        let record = self.store.create(fields).await?;
        debug!(stage = "mutation", id = %record.id, "application created");
        Ok(record)
    }

    /// Replaces every field of an existing record.
    ///
    /// Fields left out of `input` are cleared, not preserved.
    pub async fn update_application(
        &self,
        id: &ApplicationId,
        input: ApplicationInput,
    ) -> Result<ApplicationRecord, ServiceError> {
        let fields = validate(input)?;
        match self.store.update_by_id(id, fields).await? {
            Some(record) => {
                debug!(stage = "mutation", %id, "application updated");
                Ok(record)
            }
            None => {
                warn!(stage = "mutation", %id, "update targeted unknown application");
                Err(ServiceError::not_found(id))
            }
        }
    }

    /// Removes a record and returns its former identifier.
    pub async fn delete_application(
        &self,
        id: &ApplicationId,
    ) -> Result<ApplicationId, ServiceError> {
        match self.store.delete_by_id(id).await? {
            Some(deleted) => {
                debug!(stage = "mutation", id = %deleted, "application deleted");
                Ok(deleted)
            }
            None => {
                warn!(stage = "mutation", %id, "delete targeted unknown application");
                Err(ServiceError::not_found(id))
            }
        }
    }
}

fn validate(input: ApplicationInput) -> Result<ApplicationFields, ServiceError> {
    ApplicationFields::try_from(input).inspect_err(|err| {
        warn!(stage = "mutation", error = %err, "rejected application input");
    })
}
