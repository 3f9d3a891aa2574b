//! Read-only role dashboards. Nothing here is cached; every call recomputes
//! from the current rows.

use serde::Serialize;

use placement_core::types::{
    percentage, Announcement, ApplicationOverview, ApplicationStats, CompanyProfile, Event,
    InterviewOverview, InterviewStatus, JobListing, PlacementSeason, StudentProfile,
};
use placement_core::{Actor, RecordScope};
use placement_storage::{InterviewWindow, JobFilter};

use super::admin::DepartmentStatistics;
use super::{PlacementService, WorkflowError};

const RECENT_APPLICATIONS: i64 = 10;
const SHORT_LIST: i64 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Student(StudentDashboard),
    Company(CompanyDashboard),
    Officer(OfficerDashboard),
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDashboard {
    pub profile: StudentProfile,
    pub application_count: i64,
    pub recent_applications: Vec<ApplicationOverview>,
    pub upcoming_interview_count: i64,
    pub upcoming_interviews: Vec<InterviewOverview>,
    pub recent_jobs: Vec<JobListing>,
    pub announcements: Vec<Announcement>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyDashboard {
    pub profile: CompanyProfile,
    pub job_count: i64,
    pub open_jobs: Vec<JobListing>,
    pub application_stats: ApplicationStats,
    pub recent_applications: Vec<ApplicationOverview>,
    pub upcoming_interviews: Vec<InterviewOverview>,
    pub announcements: Vec<Announcement>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OfficerTotals {
    pub companies: i64,
    pub students: i64,
    pub jobs: i64,
    pub open_jobs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfficerDashboard {
    pub totals: OfficerTotals,
    pub application_stats: ApplicationStats,
    /// Share of students with at least one selected application.
    pub placement_rate: f64,
    pub active_season: Option<PlacementSeason>,
    pub department_statistics: Vec<DepartmentStatistics>,
    pub recent_jobs: Vec<JobListing>,
    pub recent_applications: Vec<ApplicationOverview>,
    pub upcoming_interviews: Vec<InterviewOverview>,
    pub announcements: Vec<Announcement>,
    pub events: Vec<Event>,
}

impl PlacementService {
    pub async fn dashboard(&self, actor: Actor) -> Result<Dashboard, WorkflowError> {
        let dashboard = match actor {
            Actor::Student { .. } => Dashboard::Student(self.student_dashboard(actor).await?),
            Actor::Company { company_id, .. } => {
                Dashboard::Company(self.company_dashboard(actor, company_id).await?)
            }
            Actor::Officer { .. } => Dashboard::Officer(self.officer_dashboard().await?),
        };
        Ok(dashboard)
    }

    async fn student_dashboard(&self, actor: Actor) -> Result<StudentDashboard, WorkflowError> {
        let now = self.now();
        let scope = actor.scope();
        let profile = self
            .database
            .profiles()
            .student_by_account(actor.account_id())
            .await?
            .ok_or(WorkflowError::NotFound("student profile"))?;

        let applications = self.database.applications();
        let interviews = self.database.interviews();
        let placement = self.database.placement();
        let upcoming = InterviewWindow::Upcoming(now);
        let accepting = JobFilter {
            accepting_on: Some(self.today()),
            ..JobFilter::open()
        };

        Ok(StudentDashboard {
            profile,
            application_count: applications.stats(scope).await?.total,
            recent_applications: applications
                .list(scope, None, Some(RECENT_APPLICATIONS))
                .await?,
            upcoming_interview_count: interviews
                .count(scope, Some(InterviewStatus::Scheduled), upcoming)
                .await?,
            upcoming_interviews: interviews
                .list(scope, Some(InterviewStatus::Scheduled), upcoming, Some(SHORT_LIST))
                .await?,
            recent_jobs: self.database.jobs().list(&accepting.limit(SHORT_LIST)).await?,
            announcements: placement
                .announcements(Some(actor.role().audience()), now, SHORT_LIST)
                .await?,
            events: placement.upcoming_events(now, SHORT_LIST).await?,
        })
    }

    async fn company_dashboard(
        &self,
        actor: Actor,
        company_id: i64,
    ) -> Result<CompanyDashboard, WorkflowError> {
        let now = self.now();
        let scope = RecordScope::Company(company_id);
        let profile = self
            .database
            .profiles()
            .company_by_account(actor.account_id())
            .await?
            .ok_or(WorkflowError::NotFound("company profile"))?;

        let jobs = self.database.jobs();
        let applications = self.database.applications();
        let open_jobs = JobFilter {
            company_id: Some(company_id),
            ..JobFilter::open()
        };

        Ok(CompanyDashboard {
            profile,
            job_count: jobs.count(&JobFilter::for_company(company_id)).await?,
            open_jobs: jobs.list(&open_jobs).await?,
            application_stats: applications.stats(scope).await?,
            recent_applications: applications
                .list(scope, None, Some(RECENT_APPLICATIONS))
                .await?,
            upcoming_interviews: self
                .database
                .interviews()
                .list(scope, None, InterviewWindow::Upcoming(now), Some(SHORT_LIST))
                .await?,
            announcements: self
                .database
                .placement()
                .announcements(Some(actor.role().audience()), now, SHORT_LIST)
                .await?,
        })
    }

    async fn officer_dashboard(&self) -> Result<OfficerDashboard, WorkflowError> {
        let now = self.now();
        let profiles = self.database.profiles();
        let jobs = self.database.jobs();
        let applications = self.database.applications();
        let placement = self.database.placement();

        let totals = OfficerTotals {
            companies: profiles.count_companies().await?,
            students: profiles.count_students().await?,
            jobs: jobs.count(&JobFilter::default()).await?,
            open_jobs: jobs.count(&JobFilter::open()).await?,
        };
        let placed = applications.placed_students().await?;
        let active_season = placement.active_season().await?;
        let department_statistics = match &active_season {
            Some(season) => placement
                .statistics(season.id)
                .await?
                .into_iter()
                .map(DepartmentStatistics::from)
                .collect(),
            None => Vec::new(),
        };

        Ok(OfficerDashboard {
            placement_rate: percentage(placed, totals.students),
            totals,
            application_stats: applications.stats(RecordScope::All).await?,
            active_season,
            department_statistics,
            recent_jobs: jobs.list(&JobFilter::default().limit(SHORT_LIST)).await?,
            recent_applications: applications
                .list(RecordScope::All, None, Some(SHORT_LIST))
                .await?,
            upcoming_interviews: self
                .database
                .interviews()
                .list(RecordScope::All, None, InterviewWindow::Upcoming(now), Some(SHORT_LIST))
                .await?,
            announcements: placement.announcements(None, now, SHORT_LIST).await?,
            events: placement.upcoming_events(now, SHORT_LIST).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use placement_core::inputs::{AnnouncementDraft, NewApplication};
    use placement_core::types::{ApplicationStatus, Audience};
    use placement_core::Role;

    use super::super::test_support::{harness, online_interview};
    use super::*;

    #[tokio::test]
    async fn empty_dashboards_render_for_every_role() {
        let h = harness().await;
        let (_, student) = h.register("ravi", Role::Student).await;
        let (_, company) = h.register("acme", Role::Company).await;
        let (_, officer) = h.register("meera", Role::Officer).await;

        match h.service.dashboard(student).await.expect("student") {
            Dashboard::Student(board) => {
                assert_eq!(board.application_count, 0);
                assert!(board.recent_jobs.is_empty());
                assert!(board.events.is_empty());
            }
            other => panic!("unexpected dashboard: {other:?}"),
        }
        match h.service.dashboard(company).await.expect("company") {
            Dashboard::Company(board) => {
                assert_eq!(board.job_count, 0);
                assert_eq!(board.application_stats, ApplicationStats::default());
            }
            other => panic!("unexpected dashboard: {other:?}"),
        }
        match h.service.dashboard(officer).await.expect("officer") {
            Dashboard::Officer(board) => {
                assert_eq!(board.totals.students, 1);
                assert_eq!(board.placement_rate, 0.0);
                assert!(board.active_season.is_none());
            }
            other => panic!("unexpected dashboard: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dashboards_reflect_the_placement_pipeline() {
        let h = harness().await;
        let (_, student) = h.register("ravi", Role::Student).await;
        let (_, peer) = h.register("kiran", Role::Student).await;
        let (_, company) = h.register("acme", Role::Company).await;
        let (_, officer) = h.register("meera", Role::Officer).await;
        let job = h.post_job(company, "Backend Engineer").await;
        let letter = || NewApplication {
            cover_letter: String::new(),
        };
        let mine = h.service.apply(student, job.id, letter()).await.expect("apply");
        h.service.apply(peer, job.id, letter()).await.expect("apply");
        h.service
            .schedule_interview(company, mine.id, online_interview(2))
            .await
            .expect("schedule");
        h.service
            .update_application_status(officer, mine.id, ApplicationStatus::Selected)
            .await
            .expect("select");
        h.service
            .post_announcement(
                officer,
                AnnouncementDraft {
                    title: "Company visit".into(),
                    content: "Acme visits on Monday.".into(),
                    audience: Audience::Companies,
                    expires_at: None,
                    is_active: true,
                },
            )
            .await
            .expect("announce");

        match h.service.dashboard(student).await.expect("student") {
            Dashboard::Student(board) => {
                assert_eq!(board.application_count, 1);
                assert_eq!(board.upcoming_interview_count, 1);
                assert_eq!(board.recent_jobs.len(), 1);
                assert!(board.announcements.is_empty());
            }
            other => panic!("unexpected dashboard: {other:?}"),
        }
        match h.service.dashboard(company).await.expect("company") {
            Dashboard::Company(board) => {
                assert_eq!(board.application_stats.total, 2);
                assert_eq!(board.application_stats.selected, 1);
                assert_eq!(board.application_stats.applied, 1);
                assert_eq!(board.upcoming_interviews.len(), 1);
                assert_eq!(board.announcements.len(), 1);
            }
            other => panic!("unexpected dashboard: {other:?}"),
        }
        match h.service.dashboard(officer).await.expect("officer") {
            Dashboard::Officer(board) => {
                assert_eq!(board.totals.jobs, 1);
                assert_eq!(board.totals.open_jobs, 1);
                assert_eq!(board.placement_rate, 50.0);
                assert_eq!(board.recent_applications.len(), 2);
                assert_eq!(board.announcements.len(), 1);
            }
            other => panic!("unexpected dashboard: {other:?}"),
        }
    }
}
