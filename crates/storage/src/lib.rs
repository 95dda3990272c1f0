use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use jobtrack_core::{
    ApplicationFields, ApplicationId, ApplicationRecord, ApplicationStore, CountPredicate,
    MonthlyCount, StoreError, TimelineEntry,
};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// The database file is created when missing. Every pooled connection runs in
    /// WAL mode with a 5 second busy timeout.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to operate on application records.
    pub fn applications(&self) -> ApplicationRepository {
        ApplicationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to decode history json: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::Decode(_) => StoreError::Corrupt(err.to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

const SELECT_COLUMNS: &str = "id, company, position, location, status, date_submitted, \
     next_due, history_json, notes, link";

/// Repository for application records.
#[derive(Clone)]
pub struct ApplicationRepository {
    pool: SqlitePool,
}

impl ApplicationRepository {
    /// Inserts a new record under a freshly generated identifier.
    pub async fn insert(
        &self,
        fields: ApplicationFields,
    ) -> Result<ApplicationRecord, StorageError> {
        let id = Uuid::new_v4().to_string();
        let history_json = serde_json::to_string(&fields.history)?;

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "INSERT INTO applications \
             (id, company, position, location, status, date_submitted, next_due, history_json, notes, link) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&id)
        .bind(&fields.company)
        .bind(&fields.position)
        .bind(&fields.location)
        .bind(&fields.status)
        .bind(fields.date_submitted.map(to_rfc3339))
        .bind(fields.next_due.map(to_rfc3339))
        .bind(&history_json)
        .bind(&fields.notes)
        .bind(&fields.link)
        .fetch_one(&self.pool)
        .await?;

        debug!(stage = "storage", %id, "inserted application");
        row.into_domain()
    }

    /// Loads a single record.
    pub async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, StorageError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM applications WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApplicationRow::into_domain).transpose()
    }

    /// Loads every record in insertion order.
    pub async fn list(&self) -> Result<Vec<ApplicationRecord>, StorageError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM applications ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApplicationRow::into_domain).collect()
    }

    /// Overwrites every mutable column of an existing record.
    pub async fn replace(
        &self,
        id: &ApplicationId,
        fields: ApplicationFields,
    ) -> Result<Option<ApplicationRecord>, StorageError> {
        let history_json = serde_json::to_string(&fields.history)?;

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE applications \
             SET company = ?, position = ?, location = ?, status = ?, date_submitted = ?, \
                 next_due = ?, history_json = ?, notes = ?, link = ? \
             WHERE id = ? \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&fields.company)
        .bind(&fields.position)
        .bind(&fields.location)
        .bind(&fields.status)
        .bind(fields.date_submitted.map(to_rfc3339))
        .bind(fields.next_due.map(to_rfc3339))
        .bind(&history_json)
        .bind(&fields.notes)
        .bind(&fields.link)
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApplicationRow::into_domain).transpose()
    }

    /// Deletes a record, returning its identifier when it existed.
    pub async fn remove(&self, id: &ApplicationId) -> Result<Option<ApplicationId>, StorageError> {
        let row = sqlx::query_as::<_, (String,)>("DELETE FROM applications WHERE id = ? RETURNING id")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id,)| ApplicationId(id)))
    }

    /// Counts records matching the predicate without loading them.
    pub async fn count_matching(&self, predicate: &CountPredicate) -> Result<u64, StorageError> {
        let (count,): (i64,) = match predicate {
            CountPredicate::Submitted => {
                sqlx::query_as::<_, (i64,)>(
                    "SELECT COUNT(*) FROM applications WHERE date_submitted IS NOT NULL",
                )
                .fetch_one(&self.pool)
                .await?
            }
            CountPredicate::StatusEquals(status) => {
                sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM applications WHERE status = ?")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            CountPredicate::LocationContains(needle) => {
                sqlx::query_as::<_, (i64,)>(
                    "SELECT COUNT(*) FROM applications WHERE instr(lower(location), lower(?)) > 0",
                )
                .bind(needle)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(count as u64)
    }

    /// Buckets submitted records by calendar month, ordered chronologically.
    pub async fn submissions_by_month(&self) -> Result<Vec<MonthlyCount>, StorageError> {
        let rows = sqlx::query_as::<_, MonthRow>(
            "SELECT CAST(strftime('%Y', date_submitted) AS INTEGER) AS year, \
                    CAST(strftime('%m', date_submitted) AS INTEGER) AS month, \
                    COUNT(*) AS count \
               FROM applications \
              WHERE date_submitted IS NOT NULL \
              GROUP BY year, month \
              ORDER BY year, month",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| MonthlyCount {
                year: row.year as i32,
                month: row.month as u32,
                count: row.count as u64,
            })
            .collect())
    }
}

#[async_trait]
impl ApplicationStore for ApplicationRepository {
    async fn create(&self, fields: ApplicationFields) -> Result<ApplicationRecord, StoreError> {
        Ok(self.insert(fields).await?)
    }

    async fn get_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.fetch(id).await?)
    }

    async fn get_all(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(self.list().await?)
    }

    async fn update_by_id(
        &self,
        id: &ApplicationId,
        fields: ApplicationFields,
    ) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.replace(id, fields).await?)
    }

    async fn delete_by_id(&self, id: &ApplicationId) -> Result<Option<ApplicationId>, StoreError> {
        Ok(self.remove(id).await?)
    }

    async fn count(&self, predicate: &CountPredicate) -> Result<u64, StoreError> {
        Ok(self.count_matching(predicate).await?)
    }

    async fn group_by_submission_month(&self) -> Result<Vec<MonthlyCount>, StoreError> {
        Ok(self.submissions_by_month().await?)
    }
}

/// Raw row of the `applications` table.
#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    company: String,
    position: String,
    location: String,
    status: String,
    date_submitted: Option<DateTime<Utc>>,
    next_due: Option<DateTime<Utc>>,
    history_json: String,
    notes: Option<String>,
    link: Option<String>,
}

impl ApplicationRow {
    fn into_domain(self) -> Result<ApplicationRecord, StorageError> {
        let history: Vec<TimelineEntry> =
            serde_json::from_str(&self.history_json).inspect_err(|err| {
                warn!(stage = "storage", id = %self.id, error = %err, "stored history is not valid json");
            })?;

        Ok(ApplicationRecord {
            id: ApplicationId(self.id),
            company: self.company,
            position: self.position,
            location: self.location,
            status: self.status,
            date_submitted: self.date_submitted,
            next_due: self.next_due,
            history,
            notes: self.notes,
            link: self.link,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MonthRow {
    year: i64,
    month: i64,
    count: i64,
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
