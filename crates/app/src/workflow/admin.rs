use serde::Serialize;
use tracing::info;

use placement_core::inputs::{AnnouncementDraft, EventDraft, SeasonDraft, StatisticsDraft};
use placement_core::rules;
use placement_core::types::{
    Announcement, Event, JobType, PlacementSeason, PlacementStatistics,
};
use placement_core::{Actor, ValidationErrors};

use super::{conflicts, missing_reference, PlacementService, WorkflowError};

/// Department figures with the derived placement rate.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentStatistics {
    #[serde(flatten)]
    pub statistics: PlacementStatistics,
    pub placement_percentage: f64,
}

impl From<PlacementStatistics> for DepartmentStatistics {
    fn from(statistics: PlacementStatistics) -> Self {
        Self {
            placement_percentage: statistics.placement_percentage(),
            statistics,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobTypeCount {
    pub job_type: JobType,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsView {
    pub seasons: Vec<PlacementSeason>,
    pub season: Option<PlacementSeason>,
    pub departments: Vec<DepartmentStatistics>,
    pub job_types: Vec<JobTypeCount>,
    pub monthly_jobs: Vec<MonthlyCount>,
}

impl PlacementService {
    pub async fn create_season(
        &self,
        actor: Actor,
        draft: SeasonDraft,
    ) -> Result<PlacementSeason, WorkflowError> {
        actor.require_officer("create placement seasons")?;
        rules::validate_season(&draft)?;

        let mut tx = self.database.begin().await?;
        let season = self
            .database
            .placement()
            .insert_season(&mut tx, &draft)
            .await
            .map_err(|err| {
                conflicts(
                    err,
                    &[(
                        "placement_seasons.year",
                        "year",
                        "Placement season with this year already exists.",
                    )],
                )
            })?;
        tx.commit().await?;

        info!(
            stage = "placement",
            season_id = season.id,
            active = season.is_active,
            "placement season created"
        );
        Ok(season)
    }

    /// Records a department's figures against the active season.
    pub async fn upsert_statistics(
        &self,
        actor: Actor,
        department: &str,
        draft: StatisticsDraft,
    ) -> Result<DepartmentStatistics, WorkflowError> {
        actor.require_officer("record placement statistics")?;
        let department = department.trim();
        if department.is_empty() {
            return Err(ValidationErrors::single("department", "This field is required.").into());
        }
        rules::validate_statistics(&draft)?;

        let placement = self.database.placement();
        let season = placement.active_season().await?.ok_or_else(|| {
            WorkflowError::from(ValidationErrors::single(
                "season",
                "There is no active placement season.",
            ))
        })?;
        let statistics = placement
            .upsert_statistics(season.id, department, &draft)
            .await?;
        Ok(statistics.into())
    }

    pub async fn post_announcement(
        &self,
        actor: Actor,
        draft: AnnouncementDraft,
    ) -> Result<Announcement, WorkflowError> {
        actor.require_officer("post announcements")?;
        rules::validate_announcement(&draft)?;
        Ok(self
            .database
            .placement()
            .insert_announcement(actor.account_id(), &draft, self.now())
            .await?)
    }

    pub async fn create_event(&self, actor: Actor, draft: EventDraft) -> Result<Event, WorkflowError> {
        actor.require_officer("create events")?;
        rules::validate_event(&draft)?;
        self.database
            .placement()
            .insert_event(actor.account_id(), &draft, self.now())
            .await
            .map_err(|err| missing_reference(err, "company_id"))
    }

    /// Season overview. Without `season_id` the active season is shown, or
    /// the most recent one when none is active.
    pub async fn statistics(&self, season_id: Option<i64>) -> Result<StatisticsView, WorkflowError> {
        let placement = self.database.placement();
        let seasons = placement.seasons().await?;
        let season = match season_id {
            Some(id) => Some(
                placement
                    .season(id)
                    .await?
                    .ok_or(WorkflowError::NotFound("placement season"))?,
            ),
            None => match placement.active_season().await? {
                Some(active) => Some(active),
                None => seasons.first().cloned(),
            },
        };

        let (departments, range) = match &season {
            Some(season) => (
                placement
                    .statistics(season.id)
                    .await?
                    .into_iter()
                    .map(DepartmentStatistics::from)
                    .collect(),
                Some((season.start_date, season.end_date)),
            ),
            None => (Vec::new(), None),
        };

        let jobs = self.database.jobs();
        let job_types = jobs
            .count_by_type(range)
            .await?
            .into_iter()
            .map(|(job_type, count)| JobTypeCount { job_type, count })
            .collect();
        let monthly_jobs = jobs
            .count_by_month(range)
            .await?
            .into_iter()
            .map(|(month, count)| MonthlyCount { month, count })
            .collect();

        Ok(StatisticsView {
            seasons,
            season,
            departments,
            job_types,
            monthly_jobs,
        })
    }
}
