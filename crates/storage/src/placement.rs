use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use placement_core::inputs::{AnnouncementDraft, EventDraft, SeasonDraft, StatisticsDraft};
use placement_core::types::{Announcement, Audience, Event, PlacementSeason, PlacementStatistics};

use crate::{map_write_error, to_rfc3339, StorageError};

const STATISTICS_COLUMNS: &str = "id, season_id, department, total_students, placed_students, \
     highest_package, average_package, total_companies_visited";

const ANNOUNCEMENT_COLUMNS: &str =
    "id, title, content, audience, created_by, created_at, expires_at, is_active";

const EVENT_COLUMNS: &str =
    "id, title, description, date_time, location, company_id, created_by, created_at, is_active";

/// Repository for seasons, statistics, announcements and events.
#[derive(Clone)]
pub struct PlacementRepository {
    pub(crate) pool: SqlitePool,
}

impl PlacementRepository {
    /// Inserts a season. An active season first deactivates every other season.
    pub async fn insert_season(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        draft: &SeasonDraft,
    ) -> Result<PlacementSeason, StorageError> {
        if draft.is_active {
            sqlx::query("UPDATE placement_seasons SET is_active = 0 WHERE is_active = 1")
                .execute(&mut **tx)
                .await?;
        }

        let row = sqlx::query_as::<_, SeasonRow>(
            "INSERT INTO placement_seasons (year, start_date, end_date, is_active) \
             VALUES (?, ?, ?, ?) \
             RETURNING id, year, start_date, end_date, is_active",
        )
        .bind(draft.year.trim())
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.is_active)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?;

        Ok(row.into_domain())
    }

    pub async fn active_season(&self) -> Result<Option<PlacementSeason>, StorageError> {
        let row = sqlx::query_as::<_, SeasonRow>(
            "SELECT id, year, start_date, end_date, is_active \
             FROM placement_seasons WHERE is_active = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SeasonRow::into_domain))
    }

    pub async fn season(&self, season_id: i64) -> Result<Option<PlacementSeason>, StorageError> {
        let row = sqlx::query_as::<_, SeasonRow>(
            "SELECT id, year, start_date, end_date, is_active \
             FROM placement_seasons WHERE id = ?",
        )
        .bind(season_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SeasonRow::into_domain))
    }

    /// Most recent season first.
    pub async fn seasons(&self) -> Result<Vec<PlacementSeason>, StorageError> {
        let rows = sqlx::query_as::<_, SeasonRow>(
            "SELECT id, year, start_date, end_date, is_active \
             FROM placement_seasons ORDER BY start_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SeasonRow::into_domain).collect())
    }

    /// Creates or replaces the statistics row for `(season_id, department)`.
    pub async fn upsert_statistics(
        &self,
        season_id: i64,
        department: &str,
        draft: &StatisticsDraft,
    ) -> Result<PlacementStatistics, StorageError> {
        let row = sqlx::query_as::<_, StatisticsRow>(&format!(
            "INSERT INTO placement_statistics \
             (season_id, department, total_students, placed_students, highest_package, \
              average_package, total_companies_visited) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(season_id, department) DO UPDATE \
             SET total_students = excluded.total_students, \
                 placed_students = excluded.placed_students, \
                 highest_package = excluded.highest_package, \
                 average_package = excluded.average_package, \
                 total_companies_visited = excluded.total_companies_visited \
             RETURNING {STATISTICS_COLUMNS}"
        ))
        .bind(season_id)
        .bind(department.trim())
        .bind(draft.total_students)
        .bind(draft.placed_students)
        .bind(draft.highest_package)
        .bind(draft.average_package)
        .bind(draft.total_companies_visited)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into_domain())
    }

    /// Statistics rows for the season ordered by department.
    pub async fn statistics(&self, season_id: i64) -> Result<Vec<PlacementStatistics>, StorageError> {
        let rows = sqlx::query_as::<_, StatisticsRow>(&format!(
            "SELECT {STATISTICS_COLUMNS} FROM placement_statistics \
             WHERE season_id = ? ORDER BY department"
        ))
        .bind(season_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StatisticsRow::into_domain).collect())
    }

    pub async fn insert_announcement(
        &self,
        created_by: i64,
        draft: &AnnouncementDraft,
        at: DateTime<Utc>,
    ) -> Result<Announcement, StorageError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "INSERT INTO announcements \
             (title, content, audience, created_by, created_at, expires_at, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(draft.title.trim())
        .bind(&draft.content)
        .bind(draft.audience.as_str())
        .bind(created_by)
        .bind(to_rfc3339(at))
        .bind(draft.expires_at.map(to_rfc3339))
        .bind(draft.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.into_domain()
    }

    /// Active announcements, newest first.
    ///
    /// With an audience, only announcements addressed to it or to everyone
    /// and not yet expired at `now` are returned.
    pub async fn announcements(
        &self,
        audience: Option<Audience>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Announcement>, StorageError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE is_active = 1"
        ));
        if let Some(audience) = audience {
            builder.push(" AND audience IN ('all', ");
            builder.push_bind(audience.as_str());
            builder.push(") AND (expires_at IS NULL OR expires_at >= ");
            builder.push_bind(to_rfc3339(now));
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);

        let rows = builder
            .build_query_as::<AnnouncementRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AnnouncementRow::into_domain).collect()
    }

    /// An unknown company surfaces as `MissingReference`.
    pub async fn insert_event(
        &self,
        created_by: i64,
        draft: &EventDraft,
        at: DateTime<Utc>,
    ) -> Result<Event, StorageError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO events \
             (title, description, date_time, location, company_id, created_by, created_at, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(draft.title.trim())
        .bind(&draft.description)
        .bind(to_rfc3339(draft.date_time))
        .bind(draft.location.trim())
        .bind(draft.company_id)
        .bind(created_by)
        .bind(to_rfc3339(at))
        .bind(draft.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into_domain())
    }

    /// Active events at or after `now`, soonest first.
    pub async fn upcoming_events(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Event>, StorageError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE is_active = 1 AND date_time >= ? \
             ORDER BY date_time ASC, id ASC LIMIT ?"
        ))
        .bind(to_rfc3339(now))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EventRow::into_domain).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SeasonRow {
    id: i64,
    year: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    is_active: bool,
}

impl SeasonRow {
    fn into_domain(self) -> PlacementSeason {
        PlacementSeason {
            id: self.id,
            year: self.year,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatisticsRow {
    id: i64,
    season_id: i64,
    department: String,
    total_students: i64,
    placed_students: i64,
    highest_package: Option<f64>,
    average_package: Option<f64>,
    total_companies_visited: i64,
}

impl StatisticsRow {
    fn into_domain(self) -> PlacementStatistics {
        PlacementStatistics {
            id: self.id,
            season_id: self.season_id,
            department: self.department,
            total_students: self.total_students,
            placed_students: self.placed_students,
            highest_package: self.highest_package,
            average_package: self.average_package,
            total_companies_visited: self.total_companies_visited,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AnnouncementRow {
    id: i64,
    title: String,
    content: String,
    audience: String,
    created_by: i64,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl AnnouncementRow {
    fn into_domain(self) -> Result<Announcement, StorageError> {
        Ok(Announcement {
            id: self.id,
            title: self.title,
            content: self.content,
            audience: self.audience.parse()?,
            created_by: self.created_by,
            created_at: self.created_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: String,
    date_time: DateTime<Utc>,
    location: String,
    company_id: Option<i64>,
    created_by: i64,
    created_at: DateTime<Utc>,
    is_active: bool,
}

impl EventRow {
    fn into_domain(self) -> Event {
        Event {
            id: self.id,
            title: self.title,
            description: self.description,
            date_time: self.date_time,
            location: self.location,
            company_id: self.company_id,
            created_by: self.created_by,
            created_at: self.created_at,
            is_active: self.is_active,
        }
    }
}
