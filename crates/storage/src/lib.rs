use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    QueryBuilder, Sqlite, SqlitePool, Transaction,
};
use thiserror::Error;

use placement_core::{types::UnknownVariant, RecordScope};

pub mod accounts;
pub mod applications;
pub mod interviews;
pub mod jobs;
pub mod notifications;
pub mod placement;
pub mod profiles;

pub use accounts::{AccountRepository, NewAccountRecord};
pub use applications::ApplicationRepository;
pub use interviews::{InterviewRepository, InterviewWindow};
pub use jobs::{JobFilter, JobRepository};
pub use notifications::NotificationRepository;
pub use placement::PlacementRepository;
pub use profiles::ProfileRepository;

/// Transaction handle shared by every multi-statement write.
pub type Tx = Transaction<'static, Sqlite>;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = connect_options(database_url)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
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

    /// Begins a SQLite transaction that already holds the write lock.
    ///
    /// Executors read before they write. A deferred transaction whose snapshot
    /// went stale cannot upgrade (SQLITE_BUSY_SNAPSHOT, no busy wait), so the
    /// lock is taken by the first statement, where `busy_timeout` applies.
    pub async fn begin(&self) -> Result<Tx, StorageError> {
        let mut tx = self.pool.begin().await?;
        // Matches no rows; only takes the RESERVED lock.
        sqlx::query("UPDATE accounts SET username = username WHERE 0")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    pub fn accounts(&self) -> AccountRepository {
        AccountRepository {
            pool: self.pool.clone(),
        }
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository {
            pool: self.pool.clone(),
        }
    }

    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository {
            pool: self.pool.clone(),
        }
    }

    pub fn jobs(&self) -> JobRepository {
        JobRepository {
            pool: self.pool.clone(),
        }
    }

    pub fn applications(&self) -> ApplicationRepository {
        ApplicationRepository {
            pool: self.pool.clone(),
        }
    }

    pub fn interviews(&self) -> InterviewRepository {
        InterviewRepository {
            pool: self.pool.clone(),
        }
    }

    /// Seasons, statistics, announcements and events.
    pub fn placement(&self) -> PlacementRepository {
        PlacementRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Pragmas are set on the connect options so every pooled connection carries them.
fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, StorageError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(StorageError::Connect)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(5000));
    Ok(options)
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("unique constraint violated on {constraint}")]
    Duplicate { constraint: String },
    #[error("referenced row does not exist")]
    MissingReference,
    #[error("failed to decode stored row: {0}")]
    Decode(#[from] UnknownVariant),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// True when a unique constraint on `column` (e.g. `accounts.email`) rejected the write.
    pub fn is_duplicate_on(&self, column: &str) -> bool {
        match self {
            Self::Duplicate { constraint } => constraint.split(", ").any(|name| name == column),
            _ => false,
        }
    }
}

/// Maps SQLite constraint codes onto the storage error variants.
pub(crate) fn map_write_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("2067") | Some("1555") => {
                let message = db_err.message();
                let constraint = message
                    .strip_prefix("UNIQUE constraint failed: ")
                    .unwrap_or(message)
                    .to_string();
                return StorageError::Duplicate { constraint };
            }
            Some("787") => return StorageError::MissingReference,
            _ => {}
        }
    }
    StorageError::Database(err)
}

pub(crate) fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Appends the visibility clause for `scope` to a query that already has a WHERE.
pub(crate) fn push_scope(
    builder: &mut QueryBuilder<'_, Sqlite>,
    scope: RecordScope,
    student_column: &str,
    company_column: &str,
) {
    match scope {
        RecordScope::Student(student_id) => {
            builder.push(format!(" AND {student_column} = "));
            builder.push_bind(student_id);
        }
        RecordScope::Company(company_id) => {
            builder.push(format!(" AND {company_column} = "));
            builder.push_bind(company_id);
        }
        RecordScope::All => {}
    }
}
