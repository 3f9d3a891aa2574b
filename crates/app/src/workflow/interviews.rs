use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;
use tracing::info;

use placement_core::inputs::{InterviewDraft, InterviewPatch};
use placement_core::messages;
use placement_core::rules;
use placement_core::types::{ApplicationStatus, Interview, InterviewOverview, InterviewStatus};
use placement_core::Actor;
use placement_storage::InterviewWindow;

use super::{PlacementService, WorkflowError};

/// Time filter for interview listings, relative to the start of today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    #[default]
    Upcoming,
    Past,
    All,
}

impl When {
    fn window(self, now: DateTime<Utc>) -> InterviewWindow {
        let start_of_today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now);
        match self {
            Self::Upcoming => InterviewWindow::Upcoming(start_of_today),
            Self::Past => InterviewWindow::Past(start_of_today),
            Self::All => InterviewWindow::All,
        }
    }
}

impl PlacementService {
    /// Schedules an interview and moves the application to shortlisted.
    ///
    /// The shortlisting is unconditional: a selected or rejected application
    /// is moved back as well.
    pub async fn schedule_interview(
        &self,
        actor: Actor,
        application_id: i64,
        draft: InterviewDraft,
    ) -> Result<Interview, WorkflowError> {
        let mut tx = self.database.begin().await?;
        let context = self
            .database
            .applications()
            .context(&mut tx, application_id)
            .await?
            .ok_or(WorkflowError::NotFound("application"))?;
        actor.ensure_can_manage(context.company_id, "schedule interviews")?;
        rules::validate_interview_draft(&draft, self.now())?;

        let interview = self
            .database
            .interviews()
            .insert(&mut tx, application_id, &draft, self.now())
            .await?;
        let status_email = self
            .transition(&mut tx, &context, ApplicationStatus::Shortlisted)
            .await?;
        let alert = messages::interview_scheduled(&context.job_title, interview.date_time);
        self.notify(&mut tx, context.student_account_id, &alert, "interview_scheduled")
            .await?;
        tx.commit().await?;

        counter!("interviews_scheduled_total").increment(1);
        info!(
            stage = "interview",
            interview_id = interview.id,
            application_id,
            at = %interview.date_time,
            "interview scheduled"
        );

        let details = messages::interview_scheduled_email(&context, &interview);
        self.send_email(&context.student_email, details, "interview_scheduled")
            .await;
        if let Some(email) = status_email {
            self.send_email(&context.student_email, email, "status_changed")
                .await;
        }
        Ok(interview)
    }

    /// Applies a partial edit. Completing the interview tells the student
    /// that feedback is available; other edits notify nobody.
    pub async fn update_interview(
        &self,
        actor: Actor,
        interview_id: i64,
        patch: InterviewPatch,
    ) -> Result<Interview, WorkflowError> {
        let mut tx = self.database.begin().await?;
        let interviews = self.database.interviews();
        let current = interviews
            .fetch(&mut tx, interview_id)
            .await?
            .ok_or(WorkflowError::NotFound("interview"))?;
        let context = self
            .database
            .applications()
            .context(&mut tx, current.application_id)
            .await?
            .ok_or(WorkflowError::NotFound("application"))?;
        actor.ensure_can_manage(context.company_id, "update interviews")?;

        let merged = patch.merge_into(&current);
        rules::validate_interview_update(&current, &merged, self.now())?;
        let saved = interviews.update(&mut tx, &merged, self.now()).await?;

        let completed = current.status != InterviewStatus::Completed
            && saved.status == InterviewStatus::Completed;
        if completed {
            let alert = messages::interview_feedback_available(&context.company_name);
            self.notify(&mut tx, context.student_account_id, &alert, "interview_feedback")
                .await?;
        }
        tx.commit().await?;

        info!(
            stage = "interview",
            interview_id,
            status = saved.status.as_str(),
            completed,
            "interview updated"
        );
        Ok(saved)
    }

    /// Interviews visible to the caller. Upcoming ones come soonest first,
    /// the others most recent first.
    pub async fn interviews(
        &self,
        actor: Actor,
        status: Option<InterviewStatus>,
        when: When,
    ) -> Result<Vec<InterviewOverview>, WorkflowError> {
        Ok(self
            .database
            .interviews()
            .list(actor.scope(), status, when.window(self.now()), None)
            .await?)
    }
}
