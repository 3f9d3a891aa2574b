use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use placement_core::inputs::{CategoryDraft, JobPostingDraft};
use placement_core::types::{JobCategory, JobListing, JobPosting, JobStatus, JobType};

use crate::{map_write_error, to_rfc3339, StorageError};

const JOB_COLUMNS: &str = "j.id, j.company_id, j.title, j.category_id, j.job_type, j.description, \
     j.requirements, j.responsibilities, j.location, j.salary_range, j.application_deadline, \
     j.positions_available, j.status, j.min_cgpa, j.created_at, j.updated_at";

const RETURNING_COLUMNS: &str = "id, company_id, title, category_id, job_type, description, \
     requirements, responsibilities, location, salary_range, application_deadline, \
     positions_available, status, min_cgpa, created_at, updated_at";

const LISTING_FROM: &str = "FROM job_postings AS j \
     JOIN company_profiles AS c ON c.id = j.company_id \
     LEFT JOIN job_categories AS cat ON cat.id = j.category_id";

/// Repository for job postings and their categories.
#[derive(Clone)]
pub struct JobRepository {
    pub(crate) pool: SqlitePool,
}

/// Optional filters for listing and counting postings. Empty means every posting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub job_type: Option<JobType>,
    pub category_id: Option<i64>,
    pub company_id: Option<i64>,
    /// Keeps only postings whose deadline has not passed on this day.
    pub accepting_on: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl JobFilter {
    /// Open postings, the default student-facing listing.
    pub fn open() -> Self {
        Self {
            status: Some(JobStatus::Open),
            ..Self::default()
        }
    }

    pub fn for_company(company_id: i64) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl JobRepository {
    /// Creates a category. Names are unique.
    pub async fn insert_category(&self, draft: &CategoryDraft) -> Result<JobCategory, StorageError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO job_categories (name, description) VALUES (?, ?) \
             RETURNING id, name, description",
        )
        .bind(draft.name.trim())
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into_domain())
    }

    pub async fn categories(&self) -> Result<Vec<JobCategory>, StorageError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description FROM job_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CategoryRow::into_domain).collect())
    }

    /// Inserts a posting owned by `company_id`. An unknown category surfaces as `MissingReference`.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        company_id: i64,
        draft: &JobPostingDraft,
        at: DateTime<Utc>,
    ) -> Result<JobPosting, StorageError> {
        let now = to_rfc3339(at);
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "INSERT INTO job_postings \
             (company_id, title, category_id, job_type, description, requirements, \
              responsibilities, location, salary_range, application_deadline, \
              positions_available, status, min_cgpa, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {RETURNING_COLUMNS}"
        ))
        .bind(company_id)
        .bind(draft.title.trim())
        .bind(draft.category_id)
        .bind(draft.job_type.as_str())
        .bind(&draft.description)
        .bind(&draft.requirements)
        .bind(&draft.responsibilities)
        .bind(draft.location.trim())
        .bind(draft.salary_range.trim())
        .bind(draft.application_deadline)
        .bind(draft.positions_available)
        .bind(draft.status.as_str())
        .bind(draft.min_cgpa)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?;

        row.into_domain()
    }

    /// Replaces every editable field of a posting.
    pub async fn update(
        &self,
        job_id: i64,
        draft: &JobPostingDraft,
        at: DateTime<Utc>,
    ) -> Result<Option<JobPosting>, StorageError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "UPDATE job_postings \
             SET title = ?, category_id = ?, job_type = ?, description = ?, requirements = ?, \
                 responsibilities = ?, location = ?, salary_range = ?, application_deadline = ?, \
                 positions_available = ?, status = ?, min_cgpa = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING {RETURNING_COLUMNS}"
        ))
        .bind(draft.title.trim())
        .bind(draft.category_id)
        .bind(draft.job_type.as_str())
        .bind(&draft.description)
        .bind(&draft.requirements)
        .bind(&draft.responsibilities)
        .bind(draft.location.trim())
        .bind(draft.salary_range.trim())
        .bind(draft.application_deadline)
        .bind(draft.positions_available)
        .bind(draft.status.as_str())
        .bind(draft.min_cgpa)
        .bind(to_rfc3339(at))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.map(JobRow::into_domain).transpose()
    }

    /// Loads a posting inside an open transaction.
    pub async fn fetch(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        job_id: i64,
    ) -> Result<Option<JobPosting>, StorageError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM job_postings AS j WHERE j.id = ?"
        ))
        .bind(job_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(JobRow::into_domain).transpose()
    }

    /// Posting with its company and category names.
    pub async fn listing(&self, job_id: i64) -> Result<Option<JobListing>, StorageError> {
        let row = sqlx::query_as::<_, JobListingRow>(&format!(
            "SELECT {JOB_COLUMNS}, c.company_name, cat.name AS category_name \
             {LISTING_FROM} WHERE j.id = ?"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobListingRow::into_domain).transpose()
    }

    /// Newest postings first.
    pub async fn list(&self, filter: &JobFilter) -> Result<Vec<JobListing>, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {JOB_COLUMNS}, c.company_name, cat.name AS category_name \
             {LISTING_FROM} WHERE 1 = 1"
        ));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY j.created_at DESC, j.id DESC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows = builder
            .build_query_as::<JobListingRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(JobListingRow::into_domain).collect()
    }

    /// Counts postings matching `filter`. The limit is ignored.
    pub async fn count(&self, filter: &JobFilter) -> Result<i64, StorageError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM job_postings AS j WHERE 1 = 1");
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Posting counts per job type, optionally limited to postings created within `range`.
    pub async fn count_by_type(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<(JobType, i64)>, StorageError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT j.job_type, COUNT(*) FROM job_postings AS j WHERE 1 = 1");
        push_created_within(&mut builder, range);
        builder.push(" GROUP BY j.job_type ORDER BY j.job_type");

        let rows = builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(job_type, count)| Ok((job_type.parse::<JobType>()?, count)))
            .collect()
    }

    /// Posting counts per `YYYY-MM` month, oldest month first.
    pub async fn count_by_month(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<(String, i64)>, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT substr(j.created_at, 1, 7) AS month, COUNT(*) FROM job_postings AS j WHERE 1 = 1",
        );
        push_created_within(&mut builder, range);
        builder.push(" GROUP BY month ORDER BY month");

        let rows = builder
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &JobFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND j.status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(job_type) = filter.job_type {
        builder.push(" AND j.job_type = ");
        builder.push_bind(job_type.as_str());
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND j.category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(company_id) = filter.company_id {
        builder.push(" AND j.company_id = ");
        builder.push_bind(company_id);
    }
    if let Some(day) = filter.accepting_on {
        builder.push(" AND j.application_deadline >= ");
        builder.push_bind(day);
    }
}

/// Both ends of `range` are inclusive calendar days.
fn push_created_within(
    builder: &mut QueryBuilder<'_, Sqlite>,
    range: Option<(NaiveDate, NaiveDate)>,
) {
    let Some((start, end)) = range else {
        return;
    };
    builder.push(" AND j.created_at >= ");
    builder.push_bind(start.to_string());
    if let Some(after_end) = end.succ_opt() {
        builder.push(" AND j.created_at < ");
        builder.push_bind(after_end.to_string());
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: String,
}

impl CategoryRow {
    fn into_domain(self) -> JobCategory {
        JobCategory {
            id: self.id,
            name: self.name,
            description: self.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobRow {
    id: i64,
    company_id: i64,
    title: String,
    category_id: Option<i64>,
    job_type: String,
    description: String,
    requirements: String,
    responsibilities: String,
    location: String,
    salary_range: String,
    application_deadline: NaiveDate,
    positions_available: i64,
    status: String,
    min_cgpa: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_domain(self) -> Result<JobPosting, StorageError> {
        Ok(JobPosting {
            id: self.id,
            company_id: self.company_id,
            title: self.title,
            category_id: self.category_id,
            job_type: self.job_type.parse()?,
            description: self.description,
            requirements: self.requirements,
            responsibilities: self.responsibilities,
            location: self.location,
            salary_range: self.salary_range,
            application_deadline: self.application_deadline,
            positions_available: self.positions_available,
            status: self.status.parse()?,
            min_cgpa: self.min_cgpa,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobListingRow {
    #[sqlx(flatten)]
    job: JobRow,
    company_name: String,
    category_name: Option<String>,
}

impl JobListingRow {
    fn into_domain(self) -> Result<JobListing, StorageError> {
        Ok(JobListing {
            job: self.job.into_domain()?,
            company_name: self.company_name,
            category_name: self.category_name,
        })
    }
}
