use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::inputs::{
    AccountUpdate, AnnouncementDraft, CategoryDraft, CompanyProfileUpdate, EventDraft,
    InterviewDraft, JobPostingDraft, NewAccount, SeasonDraft, StatisticsDraft,
    StudentProfileUpdate,
};
use crate::provisioning::{is_placeholder_roll_number, placeholder_roll_number};
use crate::types::{Interview, InterviewType, JobPosting, JobStatus};

const USERNAME_MAX_LEN: usize = 150;
const MAX_CGPA: f64 = 10.0;

/// Message attached to one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Collected field-level failures. Empty means the draft is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| format!("{}: {}", err.field, err.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a failure on a single field.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|err| err.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "This field is required.");
        }
    }

    fn url(&mut self, field: &'static str, value: &str) {
        let value = value.trim();
        if !value.is_empty() && !value.starts_with("https://") && !value.starts_with("http://") {
            self.push(field, "Enter a valid URL.");
        }
    }

    fn cgpa(&mut self, field: &'static str, value: Option<f64>) {
        if let Some(cgpa) = value {
            if !(0.0..=MAX_CGPA).contains(&cgpa) {
                self.push(field, "CGPA must be between 0 and 10.");
            }
        }
    }
}

pub fn validate_registration(draft: &NewAccount) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let username = draft.username.trim();
    if username.is_empty() {
        errors.push("username", "This field is required.");
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.push("username", "Username must be 150 characters or fewer.");
    } else if username.chars().any(char::is_whitespace) {
        errors.push("username", "Username may not contain whitespace.");
    }
    email(&mut errors, &draft.email);
    errors.into_result()
}

pub fn validate_account_update(draft: &AccountUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    email(&mut errors, &draft.email);
    errors.into_result()
}

fn email(errors: &mut ValidationErrors, value: &str) {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => errors.push("email", "Enter a valid email address."),
    }
}

/// `account_id` is the editing student's account; only its own placeholder
/// roll number may be kept, the rest of the `TEMP<digits>` space stays free
/// for accounts registered later.
pub fn validate_student_profile(
    draft: &StudentProfileUpdate,
    account_id: i64,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("roll_number", &draft.roll_number);
    let roll_number = draft.roll_number.trim();
    if is_placeholder_roll_number(roll_number) && roll_number != placeholder_roll_number(account_id) {
        errors.push("roll_number", "This roll number is reserved for new accounts.");
    }
    errors.require("department", &draft.department);
    if !(1950..=2100).contains(&draft.year_of_graduation) {
        errors.push("year_of_graduation", "Enter a graduation year between 1950 and 2100.");
    }
    errors.cgpa("cgpa", draft.cgpa);
    errors.url("linkedin_profile", &draft.linkedin_profile);
    errors.url("github_profile", &draft.github_profile);
    errors.into_result()
}

pub fn validate_company_profile(
    draft: &CompanyProfileUpdate,
    current_year: i32,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("company_name", &draft.company_name);
    errors.require("industry", &draft.industry);
    errors.require("website", &draft.website);
    errors.url("website", &draft.website);
    if let Some(year) = draft.established_year {
        if !(1800..=current_year).contains(&year) {
            errors.push("established_year", "Enter a year between 1800 and the current year.");
        }
    }
    errors.into_result()
}

pub fn validate_category(draft: &CategoryDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("name", &draft.name);
    errors.into_result()
}

pub fn validate_job_posting(
    draft: &JobPostingDraft,
    today: NaiveDate,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("title", &draft.title);
    errors.require("description", &draft.description);
    errors.require("location", &draft.location);
    if draft.application_deadline < today {
        errors.push("application_deadline", "Deadline cannot be in the past.");
    }
    if draft.positions_available <= 0 {
        errors.push("positions_available", "Number of positions must be positive.");
    }
    errors.cgpa("min_cgpa", draft.min_cgpa);
    errors.into_result()
}

/// Checks that `job` still accepts applications on `today`.
pub fn check_application_window(job: &JobPosting, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if job.status != JobStatus::Open {
        errors.push("job", "This job is not accepting applications.");
    }
    if job.deadline_passed(today) {
        errors.push("application_deadline", "The application deadline has passed.");
    }
    errors.into_result()
}

pub fn validate_interview_draft(
    draft: &InterviewDraft,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if draft.date_time < now {
        errors.push("date_time", "Interview time cannot be in the past.");
    }
    venue(
        &mut errors,
        draft.interview_type,
        &draft.location,
        draft.meeting_link(),
    );
    errors.into_result()
}

/// Validates an edited interview. The past-date rule only applies when the time moved.
pub fn validate_interview_update(
    current: &Interview,
    merged: &Interview,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if merged.date_time != current.date_time && merged.date_time < now {
        errors.push("date_time", "Interview time cannot be in the past.");
    }
    venue(
        &mut errors,
        merged.interview_type,
        &merged.location,
        merged.meeting_link.as_deref(),
    );
    errors.into_result()
}

fn venue(
    errors: &mut ValidationErrors,
    interview_type: InterviewType,
    location: &str,
    meeting_link: Option<&str>,
) {
    match interview_type {
        InterviewType::Online => match meeting_link {
            None => errors.push("meeting_link", "Meeting link is required for online interviews."),
            Some(link) => errors.url("meeting_link", link),
        },
        InterviewType::InPerson if location.trim().is_empty() => {
            errors.push("location", "Location is required for in-person interviews.");
        }
        _ => {}
    }
}

pub fn validate_season(draft: &SeasonDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("year", &draft.year);
    if draft.start_date >= draft.end_date {
        errors.push("end_date", "End date must be after start date.");
    }
    errors.into_result()
}

pub fn validate_statistics(draft: &StatisticsDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if draft.total_students < 0 {
        errors.push("total_students", "Ensure this value is greater than or equal to 0.");
    }
    if draft.placed_students < 0 {
        errors.push("placed_students", "Ensure this value is greater than or equal to 0.");
    }
    if draft.total_companies_visited < 0 {
        errors.push(
            "total_companies_visited",
            "Ensure this value is greater than or equal to 0.",
        );
    }
    if draft.placed_students > draft.total_students {
        errors.push(
            "placed_students",
            "Placed students cannot be greater than total students.",
        );
    }
    errors.into_result()
}

pub fn validate_announcement(draft: &AnnouncementDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("title", &draft.title);
    errors.require("content", &draft.content);
    errors.into_result()
}

pub fn validate_event(draft: &EventDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("title", &draft.title);
    errors.require("description", &draft.description);
    errors.require("location", &draft.location);
    errors.into_result()
}
