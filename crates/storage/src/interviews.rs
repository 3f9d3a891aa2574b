use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use placement_core::inputs::InterviewDraft;
use placement_core::types::{display_name, Interview, InterviewOverview, InterviewStatus};
use placement_core::RecordScope;

use crate::{map_write_error, push_scope, to_rfc3339, StorageError};

const INTERVIEW_COLUMNS: &str = "i.id, i.application_id, i.date_time, i.location, i.interview_type, \
     i.interviewer, i.notes, i.meeting_link, i.status, i.feedback, i.created_at, i.updated_at";

const RETURNING_COLUMNS: &str = "id, application_id, date_time, location, interview_type, \
     interviewer, notes, meeting_link, status, feedback, created_at, updated_at";

/// Repository for interviews.
#[derive(Clone)]
pub struct InterviewRepository {
    pub(crate) pool: SqlitePool,
}

/// Time window relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewWindow {
    /// At or after the instant, soonest first.
    Upcoming(DateTime<Utc>),
    /// Strictly before the instant, latest first.
    Past(DateTime<Utc>),
    /// Everything, latest first.
    All,
}

impl InterviewRepository {
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        application_id: i64,
        draft: &InterviewDraft,
        at: DateTime<Utc>,
    ) -> Result<Interview, StorageError> {
        let now = to_rfc3339(at);
        let row = sqlx::query_as::<_, InterviewRow>(&format!(
            "INSERT INTO interviews \
             (application_id, date_time, location, interview_type, interviewer, notes, \
              meeting_link, status, feedback, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, '', ?, ?) \
             RETURNING {RETURNING_COLUMNS}"
        ))
        .bind(application_id)
        .bind(to_rfc3339(draft.date_time))
        .bind(draft.location.trim())
        .bind(draft.interview_type.as_str())
        .bind(draft.interviewer.trim())
        .bind(&draft.notes)
        .bind(draft.meeting_link())
        .bind(InterviewStatus::Scheduled.as_str())
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?;

        row.into_domain()
    }

    pub async fn fetch(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        interview_id: i64,
    ) -> Result<Option<Interview>, StorageError> {
        let row = sqlx::query_as::<_, InterviewRow>(&format!(
            "SELECT {RETURNING_COLUMNS} FROM interviews WHERE id = ?"
        ))
        .bind(interview_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(InterviewRow::into_domain).transpose()
    }

    /// Persists every editable field of `interview` and stamps `updated_at`.
    pub async fn update(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        interview: &Interview,
        at: DateTime<Utc>,
    ) -> Result<Interview, StorageError> {
        let row = sqlx::query_as::<_, InterviewRow>(&format!(
            "UPDATE interviews \
             SET date_time = ?, location = ?, interview_type = ?, interviewer = ?, notes = ?, \
                 meeting_link = ?, status = ?, feedback = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING {RETURNING_COLUMNS}"
        ))
        .bind(to_rfc3339(interview.date_time))
        .bind(&interview.location)
        .bind(interview.interview_type.as_str())
        .bind(&interview.interviewer)
        .bind(&interview.notes)
        .bind(interview.meeting_link.as_deref())
        .bind(interview.status.as_str())
        .bind(&interview.feedback)
        .bind(to_rfc3339(at))
        .bind(interview.id)
        .fetch_one(&mut **tx)
        .await?;

        row.into_domain()
    }

    /// Interviews visible in `scope` within `window`.
    pub async fn list(
        &self,
        scope: RecordScope,
        status: Option<InterviewStatus>,
        window: InterviewWindow,
        limit: Option<i64>,
    ) -> Result<Vec<InterviewOverview>, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {INTERVIEW_COLUMNS}, j.title AS job_title, c.company_name, \
                    u.first_name, u.last_name, u.username \
             FROM interviews AS i \
             JOIN job_applications AS a ON a.id = i.application_id \
             JOIN job_postings AS j ON j.id = a.job_id \
             JOIN company_profiles AS c ON c.id = j.company_id \
             JOIN student_profiles AS s ON s.id = a.student_id \
             JOIN accounts AS u ON u.id = s.account_id \
             WHERE 1 = 1"
        ));
        push_filters(&mut builder, scope, status, window);
        match window {
            InterviewWindow::Upcoming(_) => builder.push(" ORDER BY i.date_time ASC, i.id ASC"),
            InterviewWindow::Past(_) | InterviewWindow::All => {
                builder.push(" ORDER BY i.date_time DESC, i.id DESC")
            }
        };
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

    pub async fn count(
        &self,
        scope: RecordScope,
        status: Option<InterviewStatus>,
        window: InterviewWindow,
    ) -> Result<i64, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) \
             FROM interviews AS i \
             JOIN job_applications AS a ON a.id = i.application_id \
             JOIN job_postings AS j ON j.id = a.job_id \
             WHERE 1 = 1",
        );
        push_filters(&mut builder, scope, status, window);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    scope: RecordScope,
    status: Option<InterviewStatus>,
    window: InterviewWindow,
) {
    push_scope(builder, scope, "a.student_id", "j.company_id");
    if let Some(status) = status {
        builder.push(" AND i.status = ");
        builder.push_bind(status.as_str());
    }
    match window {
        InterviewWindow::Upcoming(at) => {
            builder.push(" AND i.date_time >= ");
            builder.push_bind(to_rfc3339(at));
        }
        InterviewWindow::Past(at) => {
            builder.push(" AND i.date_time < ");
            builder.push_bind(to_rfc3339(at));
        }
        InterviewWindow::All => {}
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InterviewRow {
    id: i64,
    application_id: i64,
    date_time: DateTime<Utc>,
    location: String,
    interview_type: String,
    interviewer: String,
    notes: String,
    meeting_link: Option<String>,
    status: String,
    feedback: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InterviewRow {
    fn into_domain(self) -> Result<Interview, StorageError> {
        Ok(Interview {
            id: self.id,
            application_id: self.application_id,
            date_time: self.date_time,
            location: self.location,
            interview_type: self.interview_type.parse()?,
            interviewer: self.interviewer,
            notes: self.notes,
            meeting_link: self.meeting_link,
            status: self.status.parse()?,
            feedback: self.feedback,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    #[sqlx(flatten)]
    interview: InterviewRow,
    job_title: String,
    company_name: String,
    first_name: String,
    last_name: String,
    username: String,
}

impl OverviewRow {
    fn into_domain(self) -> Result<InterviewOverview, StorageError> {
        Ok(InterviewOverview {
            interview: self.interview.into_domain()?,
            job_title: self.job_title,
            company_name: self.company_name,
            student_name: display_name(&self.first_name, &self.last_name, &self.username),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::test_support::*;
    use crate::{Database, InterviewWindow};
    use placement_core::inputs::InterviewDraft;
    use placement_core::types::{InterviewStatus, InterviewType, JobApplication};
    use placement_core::RecordScope;

    fn draft(day: u32) -> InterviewDraft {
        InterviewDraft {
            date_time: Utc.with_ymd_and_hms(2026, 11, day, 10, 0, 0).unwrap(),
            interview_type: InterviewType::Online,
            location: String::new(),
            interviewer: "Priya".into(),
            notes: String::new(),
            meeting_link: Some("  ".into()),
        }
    }

    async fn application(db: &Database) -> (i64, JobApplication) {
        let (_, company) = company(db, "acme").await;
        let (_, student) = student(db, "ravi").await;
        let job = job(db, company.id, "Engineer").await;
        let mut tx = db.begin().await.expect("begin");
        let application = db
            .applications()
            .insert(&mut tx, job.id, student.id, "", at(10))
            .await
            .expect("insert");
        tx.commit().await.expect("commit");
        (company.id, application)
    }

    #[tokio::test]
    async fn insert_starts_scheduled_without_blank_link() {
        let (_dir, db) = setup_db().await;
        let (_, application) = application(&db).await;

        let mut tx = db.begin().await.expect("begin");
        let interview = db
            .interviews()
            .insert(&mut tx, application.id, &draft(2), at(11))
            .await
            .expect("insert");
        tx.commit().await.expect("commit");

        assert_eq!(interview.status, InterviewStatus::Scheduled);
        assert!(interview.meeting_link.is_none());
        assert!(interview.feedback.is_empty());
    }

    #[tokio::test]
    async fn update_persists_merged_fields() {
        let (_dir, db) = setup_db().await;
        let (_, application) = application(&db).await;

        let mut tx = db.begin().await.expect("begin");
        let mut interview = db
            .interviews()
            .insert(&mut tx, application.id, &draft(2), at(11))
            .await
            .expect("insert");
        interview.status = InterviewStatus::Completed;
        interview.feedback = "Clear communicator".into();
        let saved = db.interviews().update(&mut tx, &interview, at(12)).await.expect("update");
        let reloaded = db
            .interviews()
            .fetch(&mut tx, interview.id)
            .await
            .expect("fetch")
            .expect("exists");
        tx.commit().await.expect("commit");

        assert_eq!(saved, reloaded);
        assert_eq!(reloaded.status, InterviewStatus::Completed);
        assert_eq!(reloaded.updated_at, at(12));
    }

    #[tokio::test]
    async fn windows_split_upcoming_from_past() {
        let (_dir, db) = setup_db().await;
        let (company_id, application) = application(&db).await;

        let mut tx = db.begin().await.expect("begin");
        let early = db
            .interviews()
            .insert(&mut tx, application.id, &draft(2), at(11))
            .await
            .expect("insert");
        let late = db
            .interviews()
            .insert(&mut tx, application.id, &draft(9), at(11))
            .await
            .expect("insert");
        tx.commit().await.expect("commit");

        let pivot = early.date_time + Duration::days(1);
        let repo = db.interviews();
        let upcoming = repo
            .list(RecordScope::Company(company_id), None, InterviewWindow::Upcoming(pivot), None)
            .await
            .expect("list");
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].interview.id, late.id);
        assert_eq!(upcoming[0].job_title, "Engineer");

        let past = repo
            .list(RecordScope::All, None, InterviewWindow::Past(pivot), None)
            .await
            .expect("list");
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].interview.id, early.id);

        let all = repo
            .list(RecordScope::Student(application.student_id), None, InterviewWindow::All, None)
            .await
            .expect("list");
        assert_eq!(all[0].interview.id, late.id, "latest first");

        let scheduled = repo
            .count(RecordScope::All, Some(InterviewStatus::Scheduled), InterviewWindow::All)
            .await
            .expect("count");
        assert_eq!(scheduled, 2);
        let other_company = repo
            .count(RecordScope::Company(company_id + 1), None, InterviewWindow::All)
            .await
            .expect("count");
        assert_eq!(other_company, 0);
    }
}
