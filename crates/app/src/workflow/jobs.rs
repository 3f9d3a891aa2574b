use serde::{Deserialize, Serialize};
use tracing::info;

use placement_core::inputs::{CategoryDraft, JobPostingDraft};
use placement_core::messages;
use placement_core::rules;
use placement_core::types::{JobCategory, JobListing, JobPosting, JobType};
use placement_core::{AccessError, Actor, Role};
use placement_storage::JobFilter;

use super::{conflicts, missing_reference, PlacementService, WorkflowError};

/// Filters accepted by the public job listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobQuery {
    pub job_type: Option<JobType>,
    pub category: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub listing: JobListing,
    /// Only reported to students.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_applied: Option<bool>,
    pub deadline_passed: bool,
}

impl PlacementService {
    pub async fn categories(&self) -> Result<Vec<JobCategory>, WorkflowError> {
        Ok(self.database.jobs().categories().await?)
    }

    pub async fn create_category(
        &self,
        actor: Actor,
        draft: CategoryDraft,
    ) -> Result<JobCategory, WorkflowError> {
        actor.require_officer("create job categories")?;
        rules::validate_category(&draft)?;
        self.database
            .jobs()
            .insert_category(&draft)
            .await
            .map_err(|err| {
                conflicts(
                    err,
                    &[(
                        "job_categories.name",
                        "name",
                        "Job category with this name already exists.",
                    )],
                )
            })
    }

    /// Publishes a posting and alerts every officer in the same transaction.
    pub async fn post_job(
        &self,
        actor: Actor,
        draft: JobPostingDraft,
    ) -> Result<JobPosting, WorkflowError> {
        let company_id = actor.require_company("post jobs")?;
        rules::validate_job_posting(&draft, self.today())?;
        let company = self
            .database
            .profiles()
            .company(company_id)
            .await?
            .ok_or(WorkflowError::NotFound("company profile"))?;

        let mut tx = self.database.begin().await?;
        let job = self
            .database
            .jobs()
            .insert(&mut tx, company_id, &draft, self.now())
            .await
            .map_err(|err| missing_reference(err, "category_id"))?;

        let alert = messages::job_posted(&company.company_name, &job.title);
        let officers = self.database.accounts().ids_with_role(&mut tx, Role::Officer).await?;
        for officer_id in &officers {
            self.notify(&mut tx, *officer_id, &alert, "job_posted").await?;
        }
        tx.commit().await?;

        info!(
            stage = "jobs",
            job_id = job.id,
            company_id,
            officers_notified = officers.len(),
            "job posted"
        );
        Ok(job)
    }

    /// Replaces a posting's fields. Only the owning company may edit.
    pub async fn update_job(
        &self,
        actor: Actor,
        job_id: i64,
        draft: JobPostingDraft,
    ) -> Result<JobPosting, WorkflowError> {
        let company_id = actor.require_company("edit jobs")?;
        let jobs = self.database.jobs();
        let current = jobs
            .listing(job_id)
            .await?
            .ok_or(WorkflowError::NotFound("job"))?;
        if current.job.company_id != company_id {
            return Err(AccessError::NotOwner { action: "edit jobs" }.into());
        }
        rules::validate_job_posting(&draft, self.today())?;

        jobs.update(job_id, &draft, self.now())
            .await
            .map_err(|err| missing_reference(err, "category_id"))?
            .ok_or(WorkflowError::NotFound("job"))
    }

    /// Open postings, newest first.
    pub async fn jobs(&self, query: JobQuery) -> Result<Vec<JobListing>, WorkflowError> {
        let filter = JobFilter {
            job_type: query.job_type,
            category_id: query.category,
            ..JobFilter::open()
        };
        Ok(self.database.jobs().list(&filter).await?)
    }

    pub async fn job_detail(&self, actor: Actor, job_id: i64) -> Result<JobDetail, WorkflowError> {
        let listing = self
            .database
            .jobs()
            .listing(job_id)
            .await?
            .ok_or(WorkflowError::NotFound("job"))?;

        let has_applied = match actor {
            Actor::Student { student_id, .. } => Some(
                self.database
                    .applications()
                    .has_applied(job_id, student_id)
                    .await?,
            ),
            _ => None,
        };
        let deadline_passed = listing.job.deadline_passed(self.today());
        Ok(JobDetail {
            listing,
            has_applied,
            deadline_passed,
        })
    }

    /// The company's own postings in every status.
    pub async fn manage_jobs(&self, actor: Actor) -> Result<Vec<JobListing>, WorkflowError> {
        let company_id = actor.require_company("manage jobs")?;
        Ok(self
            .database
            .jobs()
            .list(&JobFilter::for_company(company_id))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use placement_core::types::JobStatus;

    use super::super::test_support::{fixed_now, harness, job_draft};
    use super::*;

    #[tokio::test]
    async fn posting_notifies_every_officer() {
        let h = harness().await;
        let (first, _) = h.register("meera", Role::Officer).await;
        let (second, _) = h.register("arjun", Role::Officer).await;
        let (_, company) = h.register("acme", Role::Company).await;

        let job = h.post_job(company, "Backend Engineer").await;
        assert_eq!(job.status, JobStatus::Open);

        for officer in [first.id, second.id] {
            let latest = &h.notifications_of(officer).await[0];
            assert_eq!(latest.title, "New Job Posted: Backend Engineer");
            assert_eq!(
                latest.message,
                "acme's Company has posted a new job: Backend Engineer"
            );
        }
    }

    #[tokio::test]
    async fn posting_rejects_bad_drafts_and_other_roles() {
        let h = harness().await;
        let (_, student) = h.register("ravi", Role::Student).await;
        let (_, company) = h.register("acme", Role::Company).await;

        let err = h
            .service
            .post_job(student, job_draft("Backend Engineer"))
            .await
            .expect_err("students cannot post");
        assert!(matches!(err, WorkflowError::Unauthorized(_)));

        let mut draft = job_draft("Backend Engineer");
        draft.application_deadline = fixed_now().date_naive() - Duration::days(1);
        draft.positions_available = 0;
        match h.service.post_job(company, draft).await {
            Err(WorkflowError::ValidationFailed(errors)) => {
                assert!(errors.has_field("application_deadline"));
                assert!(errors.has_field("positions_available"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut draft = job_draft("Backend Engineer");
        draft.category_id = Some(404);
        match h.service.post_job(company, draft).await {
            Err(WorkflowError::ValidationFailed(errors)) => assert!(errors.has_field("category_id")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(h.service.manage_jobs(company).await.expect("manage").is_empty());
    }

    #[tokio::test]
    async fn only_the_owning_company_edits() {
        let h = harness().await;
        let (_, owner) = h.register("acme", Role::Company).await;
        let (_, rival) = h.register("globex", Role::Company).await;
        let job = h.post_job(owner, "Backend Engineer").await;

        let err = h
            .service
            .update_job(rival, job.id, job_draft("Hijacked"))
            .await
            .expect_err("rival company");
        assert!(matches!(err, WorkflowError::Unauthorized(_)));

        let mut draft = job_draft("Platform Engineer");
        draft.status = JobStatus::Closed;
        let updated = h.service.update_job(owner, job.id, draft).await.expect("edit");
        assert_eq!(updated.title, "Platform Engineer");
        assert!(h.service.jobs(JobQuery::default()).await.expect("list").is_empty());
        assert_eq!(h.service.manage_jobs(owner).await.expect("manage").len(), 1);
    }

    #[tokio::test]
    async fn listing_filters_by_type_and_category() {
        let h = harness().await;
        let (_, officer) = h.register("meera", Role::Officer).await;
        let (_, company) = h.register("acme", Role::Company).await;
        let category = h
            .service
            .create_category(
                officer,
                CategoryDraft {
                    name: "Engineering".into(),
                    description: String::new(),
                },
            )
            .await
            .expect("category");

        let mut internship = job_draft("Summer Intern");
        internship.job_type = JobType::Internship;
        internship.category_id = Some(category.id);
        h.service.post_job(company, internship).await.expect("post");
        h.post_job(company, "Backend Engineer").await;

        let interns = h
            .service
            .jobs(JobQuery {
                job_type: Some(JobType::Internship),
                category: None,
            })
            .await
            .expect("list");
        assert_eq!(interns.len(), 1);
        assert_eq!(interns[0].category_name.as_deref(), Some("Engineering"));

        let by_category = h
            .service
            .jobs(JobQuery {
                job_type: None,
                category: Some(category.id),
            })
            .await
            .expect("list");
        assert_eq!(by_category.len(), 1);
        assert_eq!(h.service.jobs(JobQuery::default()).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn detail_reports_application_state_to_students_only() {
        let h = harness().await;
        let (_, company) = h.register("acme", Role::Company).await;
        let (_, student) = h.register("ravi", Role::Student).await;
        let job = h.post_job(company, "Backend Engineer").await;

        let detail = h.service.job_detail(student, job.id).await.expect("detail");
        assert_eq!(detail.has_applied, Some(false));
        assert!(!detail.deadline_passed);
        assert_eq!(detail.listing.company_name, "acme's Company");

        let detail = h.service.job_detail(company, job.id).await.expect("detail");
        assert_eq!(detail.has_applied, None);

        let err = h.service.job_detail(student, 999).await.expect_err("missing");
        assert!(matches!(err, WorkflowError::NotFound("job")));
    }

    #[tokio::test]
    async fn duplicate_category_is_a_conflict() {
        let h = harness().await;
        let (_, officer) = h.register("meera", Role::Officer).await;
        let draft = CategoryDraft {
            name: "Engineering".into(),
            description: String::new(),
        };
        h.service.create_category(officer, draft.clone()).await.expect("first");
        let err = h
            .service
            .create_category(officer, draft)
            .await
            .expect_err("duplicate");
        assert!(matches!(err, WorkflowError::Conflict { field: "name", .. }));
    }
}
