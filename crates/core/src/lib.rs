//! Job application tracking domain.
//!
//! Holds the hiring-stage timeline model, the application record types, the
//! record store boundary, and the listing, statistics, and mutation services
//! that operate over an injected store.

pub mod error;
pub mod listing;
pub mod memory;
pub mod mutation;
pub mod service;
pub mod stats;
pub mod store;
pub mod timeline;
pub mod types;

pub use error::{ErrorKind, ServiceError, StoreError};
pub use listing::{sort_newest_first, ListingService};
pub use memory::InMemoryStore;
pub use mutation::MutationService;
pub use service::ApplicationService;
pub use stats::StatisticsService;
pub use store::{ApplicationStore, CountPredicate};
pub use timeline::{build_timeline, Stage, TimelineEntry};
pub use types::{
    ApplicationFields, ApplicationId, ApplicationInput, ApplicationRecord, MonthlyCount, Summary,
    STATUS_INTERVIEW_SCHEDULED, STATUS_OFFER_RECEIVED,
};
