use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use placement_core::types::{
    display_name, ApplicationContext, ApplicationOverview, ApplicationStats, ApplicationStatus,
    JobApplication,
};
use placement_core::RecordScope;

use crate::{map_write_error, push_scope, to_rfc3339, StorageError};

const APPLICATION_COLUMNS: &str =
    "a.id, a.job_id, a.student_id, a.status, a.cover_letter, a.applied_at, a.updated_at";

const APPLICATION_JOINS: &str = "FROM job_applications AS a \
     JOIN job_postings AS j ON j.id = a.job_id \
     JOIN company_profiles AS c ON c.id = j.company_id \
     JOIN student_profiles AS s ON s.id = a.student_id \
     JOIN accounts AS u ON u.id = s.account_id";

/// Repository for job applications.
#[derive(Clone)]
pub struct ApplicationRepository {
    pub(crate) pool: SqlitePool,
}

impl ApplicationRepository {
    /// Records a new application in the `applied` state.
    ///
    /// A second application by the same student to the same job surfaces as `Duplicate`.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        job_id: i64,
        student_id: i64,
        cover_letter: &str,
        at: DateTime<Utc>,
    ) -> Result<JobApplication, StorageError> {
        let now = to_rfc3339(at);
        let row = sqlx::query_as::<_, ApplicationRow>(
            "INSERT INTO job_applications \
             (job_id, student_id, status, cover_letter, applied_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING id, job_id, student_id, status, cover_letter, applied_at, updated_at",
        )
        .bind(job_id)
        .bind(student_id)
        .bind(ApplicationStatus::Applied.as_str())
        .bind(cover_letter)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?;

        row.into_domain()
    }

    /// Loads the application with the job, company and student details used for messaging.
    pub async fn context(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        application_id: i64,
    ) -> Result<Option<ApplicationContext>, StorageError> {
        let row = sqlx::query_as::<_, ContextRow>(&format!(
            "SELECT {APPLICATION_COLUMNS}, \
                    j.title AS job_title, j.company_id, c.company_name, \
                    c.account_id AS company_account_id, s.account_id AS student_account_id, \
                    u.email AS student_email, u.first_name AS student_first_name, \
                    u.username AS student_username \
             {APPLICATION_JOINS} \
             WHERE a.id = ?"
        ))
        .bind(application_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(ContextRow::into_domain).transpose()
    }

    pub async fn update_status(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        application_id: i64,
        status: ApplicationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE job_applications SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(to_rfc3339(at))
            .bind(application_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn has_applied(&self, job_id: i64, student_id: i64) -> Result<bool, StorageError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM job_applications WHERE job_id = ? AND student_id = ?",
        )
        .bind(job_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// Applications visible in `scope`, most recent first.
    pub async fn list(
        &self,
        scope: RecordScope,
        status: Option<ApplicationStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<ApplicationOverview>, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {APPLICATION_COLUMNS}, j.title AS job_title, c.company_name, \
                    u.first_name, u.last_name, u.username \
             {APPLICATION_JOINS} \
             WHERE 1 = 1"
        ));
        push_scope(&mut builder, scope, "a.student_id", "j.company_id");
        if let Some(status) = status {
            builder.push(" AND a.status = ");
            builder.push_bind(status.as_str());
        }
        builder.push(" ORDER BY a.applied_at DESC, a.id DESC");
        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows = builder
            .build_query_as::<OverviewRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(OverviewRow::into_domain).collect()
    }

    /// Per-status counts for the applications visible in `scope`.
    pub async fn stats(&self, scope: RecordScope) -> Result<ApplicationStats, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT a.status, COUNT(*) \
             FROM job_applications AS a \
             JOIN job_postings AS j ON j.id = a.job_id \
             WHERE 1 = 1",
        );
        push_scope(&mut builder, scope, "a.student_id", "j.company_id");
        builder.push(" GROUP BY a.status");

        let rows = builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?;

        let mut stats = ApplicationStats::default();
        for (status, count) in rows {
            stats.record(status.parse()?, count);
        }
        Ok(stats)
    }

    /// Distinct students holding at least one `selected` application.
    pub async fn placed_students(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT student_id) FROM job_applications WHERE status = 'selected'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: i64,
    job_id: i64,
    student_id: i64,
    status: String,
    cover_letter: String,
    applied_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_domain(self) -> Result<JobApplication, StorageError> {
        Ok(JobApplication {
            id: self.id,
            job_id: self.job_id,
            student_id: self.student_id,
            status: self.status.parse()?,
            cover_letter: self.cover_letter,
            applied_at: self.applied_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContextRow {
    #[sqlx(flatten)]
    application: ApplicationRow,
    job_title: String,
    company_id: i64,
    company_name: String,
    company_account_id: i64,
    student_account_id: i64,
    student_email: String,
    student_first_name: String,
    student_username: String,
}

impl ContextRow {
    fn into_domain(self) -> Result<ApplicationContext, StorageError> {
        Ok(ApplicationContext {
            application: self.application.into_domain()?,
            job_title: self.job_title,
            company_id: self.company_id,
            company_name: self.company_name,
            company_account_id: self.company_account_id,
            student_account_id: self.student_account_id,
            student_email: self.student_email,
            student_first_name: self.student_first_name,
            student_username: self.student_username,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    #[sqlx(flatten)]
    application: ApplicationRow,
    job_title: String,
    company_name: String,
    first_name: String,
    last_name: String,
    username: String,
}

impl OverviewRow {
    fn into_domain(self) -> Result<ApplicationOverview, StorageError> {
        Ok(ApplicationOverview {
            application: self.application.into_domain()?,
            job_title: self.job_title,
            company_name: self.company_name,
            student_name: display_name(&self.first_name, &self.last_name, &self.username),
        })
    }
}
