use metrics::counter;
use sqlx::{Sqlite, Transaction};
use tracing::info;

use placement_core::inputs::NewApplication;
use placement_core::messages;
use placement_core::rules;
use placement_core::types::{
    ApplicationContext, ApplicationOverview, ApplicationStatus, EmailDraft, JobApplication,
};
use placement_core::Actor;

use super::{conflicts, PlacementService, WorkflowError};

impl PlacementService {
    /// Files an application for an open posting before its deadline.
    ///
    /// The window check, the insert and the company alert share one
    /// transaction; the confirmation email follows the commit.
    pub async fn apply(
        &self,
        actor: Actor,
        job_id: i64,
        draft: NewApplication,
    ) -> Result<JobApplication, WorkflowError> {
        let student_id = actor.require_student("apply for jobs")?;
        let applicant = self
            .database
            .accounts()
            .fetch(actor.account_id())
            .await?
            .ok_or(WorkflowError::NotFound("account"))?;

        let mut tx = self.database.begin().await?;
        let job = self
            .database
            .jobs()
            .fetch(&mut tx, job_id)
            .await?
            .ok_or(WorkflowError::NotFound("job"))?;
        rules::check_application_window(&job, self.today())?;

        let applications = self.database.applications();
        let application = applications
            .insert(&mut tx, job_id, student_id, draft.cover_letter.trim(), self.now())
            .await
            .map_err(|err| {
                conflicts(
                    err,
                    &[(
                        "job_applications.job_id",
                        "job",
                        "You have already applied for this job.",
                    )],
                )
            })?;
        let context = applications
            .context(&mut tx, application.id)
            .await?
            .ok_or(WorkflowError::NotFound("application"))?;

        let alert = messages::application_received(&context.job_title, &applicant.full_name());
        self.notify(&mut tx, context.company_account_id, &alert, "application_received")
            .await?;
        tx.commit().await?;

        counter!("applications_submitted_total").increment(1);
        info!(
            stage = "application",
            application_id = application.id,
            job_id,
            student_id,
            "application submitted"
        );

        let confirmation = messages::application_confirmation_email(
            applicant.greeting_name(),
            &context.job_title,
            &context.company_name,
        );
        self.send_email(&context.student_email, confirmation, "application_confirmation")
            .await;
        Ok(application)
    }

    /// Sets the status on behalf of the owning company or an officer.
    ///
    /// Setting the current status again writes nothing and sends nothing.
    pub async fn update_application_status(
        &self,
        actor: Actor,
        application_id: i64,
        status: ApplicationStatus,
    ) -> Result<JobApplication, WorkflowError> {
        let mut tx = self.database.begin().await?;
        let context = self
            .database
            .applications()
            .context(&mut tx, application_id)
            .await?
            .ok_or(WorkflowError::NotFound("application"))?;
        actor.ensure_can_manage(context.company_id, "update applications")?;

        let email = self.transition(&mut tx, &context, status).await?;
        tx.commit().await?;

        let mut application = context.application.clone();
        if let Some(email) = email {
            application.status = status;
            application.updated_at = self.now();
            self.send_email(&context.student_email, email, "status_changed")
                .await;
        }
        Ok(application)
    }

    /// Moves the application to `new` and notifies the student inside `tx`.
    ///
    /// Returns the status email to send once the transaction commits, or
    /// `None` when the status did not change.
    pub(crate) async fn transition(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        context: &ApplicationContext,
        new: ApplicationStatus,
    ) -> Result<Option<EmailDraft>, WorkflowError> {
        let old = context.application.status;
        if old == new {
            return Ok(None);
        }

        self.database
            .applications()
            .update_status(tx, context.application.id, new, self.now())
            .await?;
        let alert = messages::status_changed(&context.job_title, old, new);
        self.notify(tx, context.student_account_id, &alert, "status_changed")
            .await?;

        counter!("application_status_changes_total", "status" => new.as_str()).increment(1);
        info!(
            stage = "application",
            application_id = context.application.id,
            from = old.as_str(),
            to = new.as_str(),
            "application status changed"
        );
        Ok(Some(messages::status_changed_email(context, new)))
    }

    /// Applications visible to the caller, newest first.
    pub async fn applications(
        &self,
        actor: Actor,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationOverview>, WorkflowError> {
        Ok(self
            .database
            .applications()
            .list(actor.scope(), status, None)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use httpmock::prelude::*;
    use placement_core::types::JobStatus;
    use placement_core::Role;
    use placement_mailer::{HttpMailer, Mailer};

    use super::super::test_support::{fixed_now, harness, harness_with_mailer, job_draft, Harness};
    use super::*;

    struct Setup {
        h: Harness,
        student: Actor,
        student_account: i64,
        company: Actor,
        company_account: i64,
        officer: Actor,
        job_id: i64,
    }

    async fn setup(h: Harness) -> Setup {
        let (student_account, student) = h.register("ravi", Role::Student).await;
        let (company_account, company) = h.register("acme", Role::Company).await;
        let (_, officer) = h.register("meera", Role::Officer).await;
        let job = h.post_job(company, "Backend Engineer").await;
        Setup {
            h,
            student,
            student_account: student_account.id,
            company,
            company_account: company_account.id,
            officer,
            job_id: job.id,
        }
    }

    fn letter() -> NewApplication {
        NewApplication {
            cover_letter: "I build things.".into(),
        }
    }

    #[tokio::test]
    async fn applying_notifies_company_and_emails_student() {
        let s = setup(harness().await).await;

        let application = s.h.service.apply(s.student, s.job_id, letter()).await.expect("apply");
        assert_eq!(application.status, ApplicationStatus::Applied);

        let alert = &s.h.notifications_of(s.company_account).await[0];
        assert_eq!(alert.title, "New Application for Backend Engineer");
        assert_eq!(alert.message, "Ravi has applied for the Backend Engineer position.");

        let emails = s.h.outbox.messages_to("ravi@example.edu").await;
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].subject, "Job Application Submitted Successfully");
        assert!(emails[0].body.contains("Company: acme's Company"));
    }

    #[tokio::test]
    async fn second_application_conflicts_and_keeps_the_original() {
        let s = setup(harness().await).await;
        let original = s.h.service.apply(s.student, s.job_id, letter()).await.expect("apply");

        let err = s
            .h
            .service
            .apply(
                s.student,
                s.job_id,
                NewApplication {
                    cover_letter: "again".into(),
                },
            )
            .await
            .expect_err("duplicate");
        assert!(matches!(err, WorkflowError::Conflict { field: "job", .. }));

        let listed = s.h.service.applications(s.student, None).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].application.cover_letter, original.cover_letter);
        assert_eq!(s.h.notifications_of(s.company_account).await.len(), 2);
    }

    #[tokio::test]
    async fn closed_or_expired_jobs_reject_applications_without_writes() {
        let s = setup(harness().await).await;

        let mut closed = job_draft("Closed Role");
        closed.status = JobStatus::Closed;
        let closed = s.h.service.post_job(s.company, closed).await.expect("post");
        match s.h.service.apply(s.student, closed.id, letter()).await {
            Err(WorkflowError::ValidationFailed(errors)) => assert!(errors.has_field("job")),
            other => panic!("unexpected result: {other:?}"),
        }

        let expired = s.h.post_job(s.company, "Expired Role").await;
        sqlx::query("UPDATE job_postings SET application_deadline = ? WHERE id = ?")
            .bind((fixed_now().date_naive() - Duration::days(1)).to_string())
            .bind(expired.id)
            .execute(s.h.database.pool())
            .await
            .expect("backdate");
        match s.h.service.apply(s.student, expired.id, letter()).await {
            Err(WorkflowError::ValidationFailed(errors)) => {
                assert!(errors.has_field("application_deadline"))
            }
            other => panic!("unexpected result: {other:?}"),
        }

        assert!(s.h.service.applications(s.officer, None).await.expect("list").is_empty());
        assert!(s.h.outbox.messages_to("ravi@example.edu").await.is_empty());
    }

    #[tokio::test]
    async fn officer_selection_notifies_and_emails_once() {
        let s = setup(harness().await).await;
        let application = s.h.service.apply(s.student, s.job_id, letter()).await.expect("apply");
        let before = s.h.notifications_of(s.student_account).await.len();

        let updated = s
            .h
            .service
            .update_application_status(s.officer, application.id, ApplicationStatus::Selected)
            .await
            .expect("select");
        assert_eq!(updated.status, ApplicationStatus::Selected);

        let notifications = s.h.notifications_of(s.student_account).await;
        assert_eq!(notifications.len(), before + 1);
        assert_eq!(
            notifications[0].message,
            "Your application for Backend Engineer has been updated from applied to selected."
        );
        let emails = s.h.outbox.messages_to("ravi@example.edu").await;
        assert_eq!(emails.len(), 2);
        assert!(emails[1].subject.contains("Congratulations"));

        let listed = s.h.service.applications(s.officer, None).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].application.status, ApplicationStatus::Selected);
    }

    #[tokio::test]
    async fn same_status_has_no_side_effects() {
        let s = setup(harness().await).await;
        let application = s.h.service.apply(s.student, s.job_id, letter()).await.expect("apply");
        let notifications = s.h.notifications_of(s.student_account).await.len();
        let emails = s.h.outbox.messages().await.len();

        let unchanged = s
            .h
            .service
            .update_application_status(s.company, application.id, ApplicationStatus::Applied)
            .await
            .expect("same status");
        assert_eq!(unchanged.updated_at, application.updated_at);
        assert_eq!(s.h.notifications_of(s.student_account).await.len(), notifications);
        assert_eq!(s.h.outbox.messages().await.len(), emails);
    }

    #[tokio::test]
    async fn other_companies_and_students_cannot_change_status() {
        let s = setup(harness().await).await;
        let (_, rival) = s.h.register("globex", Role::Company).await;
        let application = s.h.service.apply(s.student, s.job_id, letter()).await.expect("apply");

        for actor in [rival, s.student] {
            let err = s
                .h
                .service
                .update_application_status(actor, application.id, ApplicationStatus::Rejected)
                .await
                .expect_err("not allowed");
            assert!(matches!(err, WorkflowError::Unauthorized(_)));
        }
        let listed = s.h.service.applications(s.company, None).await.expect("list");
        assert_eq!(listed[0].application.status, ApplicationStatus::Applied);
    }

    #[tokio::test]
    async fn failed_email_keeps_the_committed_status_change() {
        let server = MockServer::start_async().await;
        let relay = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(500).body("relay down");
            })
            .await;
        let mailer = Mailer::Http(HttpMailer::new(
            url::Url::parse(&server.url("/v1/")).expect("url"),
            None,
            "placement-cell@campus.example",
            reqwest::Client::new(),
        ));
        let s = setup(harness_with_mailer(Some(mailer)).await).await;

        let application = s.h.service.apply(s.student, s.job_id, letter()).await.expect("apply");
        let updated = s
            .h
            .service
            .update_application_status(s.company, application.id, ApplicationStatus::Rejected)
            .await
            .expect("status change survives mail failure");
        assert_eq!(updated.status, ApplicationStatus::Rejected);
        assert_eq!(relay.hits_async().await, 2);

        let listed = s.h.service.applications(s.student, None).await.expect("list");
        assert_eq!(listed[0].application.status, ApplicationStatus::Rejected);
    }

    #[tokio::test]
    async fn listings_are_scoped_by_role_and_filtered_by_status() {
        let s = setup(harness().await).await;
        let (_, other_student) = s.h.register("kiran", Role::Student).await;
        let (_, rival) = s.h.register("globex", Role::Company).await;
        let first = s.h.service.apply(s.student, s.job_id, letter()).await.expect("apply");
        s.h.service.apply(other_student, s.job_id, letter()).await.expect("apply");
        s.h.service
            .update_application_status(s.company, first.id, ApplicationStatus::UnderReview)
            .await
            .expect("review");

        assert_eq!(s.h.service.applications(s.student, None).await.expect("list").len(), 1);
        assert_eq!(s.h.service.applications(s.company, None).await.expect("list").len(), 2);
        assert!(s.h.service.applications(rival, None).await.expect("list").is_empty());
        let reviewing = s
            .h
            .service
            .applications(s.officer, Some(ApplicationStatus::UnderReview))
            .await
            .expect("list");
        assert_eq!(reviewing.len(), 1);
        assert_eq!(reviewing[0].application.id, first.id);
    }
}
