use std::fmt;

use thiserror::Error;

use crate::types::ApplicationId;

/// Opaque failure reported by a record store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Machine-checkable category of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AggregationFailure,
    Store,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::AggregationFailure => "aggregation_failure",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the listing, statistics, and mutation services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("field `{field}` is required and must not be blank")]
    Validation { field: &'static str },
    #[error("application {id} not found")]
    NotFound { id: ApplicationId },
    #[error("statistics aggregation failed in `{query}`: {source}")]
    Aggregation {
        query: &'static str,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Aggregation { .. } => ErrorKind::AggregationFailure,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    pub(crate) fn not_found(id: &ApplicationId) -> Self {
        Self::NotFound { id: id.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_stable_labels() {
        let err = ServiceError::Aggregation {
            query: "remote_count",
            source: StoreError::Unavailable("pool closed".into()),
        };
        assert_eq!(err.kind().as_str(), "aggregation_failure");
        assert_eq!(
            err.to_string(),
            "statistics aggregation failed in `remote_count`: record store unavailable: pool closed"
        );

        let err = ServiceError::from(StoreError::Corrupt("bad history".into()));
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(ServiceError::not_found(&"x".into()).kind(), ErrorKind::NotFound);
    }
}
