//! Request-scoped workflows. Every multi-write operation runs inside one SQLite
//! transaction; emails go out only after the commit and never fail the call.

mod accounts;
mod admin;
mod applications;
mod dashboard;
mod interviews;
mod jobs;
mod notifications;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use sqlx::{Sqlite, Transaction};
use thiserror::Error;
use tracing::{info, warn};

use placement_core::types::{EmailDraft, Notification, NotificationDraft};
use placement_core::{AccessError, ValidationErrors};
use placement_mailer::{EmailMessage, Mailer};
use placement_storage::{Database, StorageError};

pub use interviews::When;
pub use jobs::JobQuery;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Entry point for every placement workflow.
#[derive(Clone)]
pub struct PlacementService {
    database: Database,
    mailer: Mailer,
    clock: Clock,
}

impl PlacementService {
    pub fn new(database: Database, mailer: Mailer, clock: Clock) -> Self {
        Self {
            database,
            mailer,
            clock,
        }
    }

    pub fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Appends a notification inside `tx`. `kind` labels the metric only.
    async fn notify(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account_id: i64,
        draft: &NotificationDraft,
        kind: &'static str,
    ) -> Result<Notification, WorkflowError> {
        let notification = self
            .database
            .notifications()
            .append(tx, account_id, draft, self.now())
            .await?;
        counter!("notifications_created_total", "kind" => kind).increment(1);
        Ok(notification)
    }

    /// Best-effort delivery. Failures are logged and counted, never returned.
    async fn send_email(&self, to: &str, draft: EmailDraft, kind: &'static str) {
        let message = EmailMessage {
            to: to.to_string(),
            subject: draft.subject,
            body: draft.body,
        };
        match self.mailer.send(&message).await {
            Ok(()) => {
                counter!("emails_sent_total", "result" => "ok").increment(1);
                info!(stage = "mail", kind, to, backend = self.mailer.backend(), "email sent");
            }
            Err(err) => {
                counter!("emails_sent_total", "result" => "error").increment(1);
                warn!(stage = "mail", kind, to, error = %err, "email delivery failed");
            }
        }
    }
}

/// Failure kinds surfaced by the workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("authentication required: {0}")]
    Unauthenticated(&'static str),
    #[error(transparent)]
    Unauthorized(#[from] AccessError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    ValidationFailed(#[from] ValidationErrors),
    #[error("conflict on {field}: {message}")]
    Conflict {
        field: &'static str,
        message: &'static str,
    },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(StorageError::Database(err))
    }
}

/// Unique column, submitted field and user-facing message for one constraint.
type ConflictRule = (&'static str, &'static str, &'static str);

/// Turns unique violations listed in `rules` into `Conflict`; other errors pass through.
fn conflicts(err: StorageError, rules: &[ConflictRule]) -> WorkflowError {
    for &(column, field, message) in rules {
        if err.is_duplicate_on(column) {
            return WorkflowError::Conflict { field, message };
        }
    }
    WorkflowError::Storage(err)
}

/// Turns a dangling foreign key into a field error on `field`.
fn missing_reference(err: StorageError, field: &'static str) -> WorkflowError {
    match err {
        StorageError::MissingReference => {
            WorkflowError::ValidationFailed(ValidationErrors::single(field, "Select a valid choice."))
        }
        other => WorkflowError::Storage(other),
    }
}
