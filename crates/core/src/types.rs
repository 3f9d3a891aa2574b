use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor::Role;

/// Raised when a persisted or submitted tag does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Registered user account. The role is fixed when the row is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Returns "First Last", falling back to the username when no name is recorded.
    pub fn full_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, &self.username)
    }

    /// Returns the name used in email salutations.
    pub fn greeting_name(&self) -> &str {
        greeting_name(&self.first_name, &self.username)
    }
}

/// "First Last", or the username when both names are blank.
pub fn display_name(first_name: &str, last_name: &str, username: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

pub(crate) fn greeting_name<'a>(first_name: &'a str, username: &'a str) -> &'a str {
    let trimmed = first_name.trim();
    if trimmed.is_empty() {
        username
    } else {
        trimmed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: i64,
    pub account_id: i64,
    pub roll_number: String,
    pub department: String,
    pub year_of_graduation: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cgpa: Option<f64>,
    pub skills: String,
    pub bio: String,
    pub linkedin_profile: String,
    pub github_profile: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: i64,
    pub account_id: i64,
    pub company_name: String,
    pub industry: String,
    pub description: String,
    pub website: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub established_year: Option<i32>,
}

/// Per-account in-system message. Only the `read` flag changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub account_id: i64,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Title and body of a notification that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
}

/// Subject and body of an outgoing email; the recipient is attached by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    Internship,
    PartTime,
}

impl JobType {
    pub const ALL: [JobType; 3] = [Self::FullTime, Self::Internship, Self::PartTime];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullTime => "full_time",
            Self::Internship => "internship",
            Self::PartTime => "part_time",
        }
    }
}

impl FromStr for JobType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "full_time" => Ok(Self::FullTime),
            "internship" => Ok(Self::Internship),
            "part_time" => Ok(Self::PartTime),
            other => Err(UnknownVariant::new("job type", other)),
        }
    }
}

/// Lifecycle of a posting. Only `Open` postings accept applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Open,
    Closed,
    Draft,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Draft => "draft",
        }
    }
}

impl FromStr for JobStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "draft" => Ok(Self::Draft),
            other => Err(UnknownVariant::new("job status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub job_type: JobType,
    pub description: String,
    pub requirements: String,
    pub responsibilities: String,
    pub location: String,
    pub salary_range: String,
    pub application_deadline: NaiveDate,
    pub positions_available: i64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cgpa: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobPosting {
    /// The deadline is inclusive: applications are accepted through the whole deadline day.
    pub fn deadline_passed(&self, today: NaiveDate) -> bool {
        self.application_deadline < today
    }
}

/// Posting joined with the names shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(flatten)]
    pub job: JobPosting,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

/// Application lifecycle. Any status may be set from any other by an authorized actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Applied,
    UnderReview,
    Shortlisted,
    Rejected,
    Selected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        Self::Applied,
        Self::UnderReview,
        Self::Shortlisted,
        Self::Rejected,
        Self::Selected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::UnderReview => "under_review",
            Self::Shortlisted => "shortlisted",
            Self::Rejected => "rejected",
            Self::Selected => "selected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::UnderReview => "Under Review",
            Self::Shortlisted => "Shortlisted",
            Self::Rejected => "Rejected",
            Self::Selected => "Selected",
        }
    }

    /// `Rejected` and `Selected` end the advisory ordering.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Rejected | Self::Selected)
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "applied" => Ok(Self::Applied),
            "under_review" => Ok(Self::UnderReview),
            "shortlisted" => Ok(Self::Shortlisted),
            "rejected" => Ok(Self::Rejected),
            "selected" => Ok(Self::Selected),
            other => Err(UnknownVariant::new("application status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: i64,
    pub job_id: i64,
    pub student_id: i64,
    pub status: ApplicationStatus,
    pub cover_letter: String,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application joined with the names needed by lists and dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationOverview {
    #[serde(flatten)]
    pub application: JobApplication,
    pub job_title: String,
    pub company_name: String,
    pub student_name: String,
}

/// Per-status application counts used by dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStats {
    pub total: i64,
    pub applied: i64,
    pub under_review: i64,
    pub shortlisted: i64,
    pub selected: i64,
    pub rejected: i64,
}

impl ApplicationStats {
    /// Adds `count` applications currently in `status`.
    pub fn record(&mut self, status: ApplicationStatus, count: i64) {
        self.total += count;
        let slot = match status {
            ApplicationStatus::Applied => &mut self.applied,
            ApplicationStatus::UnderReview => &mut self.under_review,
            ApplicationStatus::Shortlisted => &mut self.shortlisted,
            ApplicationStatus::Selected => &mut self.selected,
            ApplicationStatus::Rejected => &mut self.rejected,
        };
        *slot += count;
    }
}

/// Everything the application workflow needs to address the student and the company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationContext {
    pub application: JobApplication,
    pub job_title: String,
    pub company_id: i64,
    pub company_name: String,
    pub company_account_id: i64,
    pub student_account_id: i64,
    pub student_email: String,
    pub student_first_name: String,
    pub student_username: String,
}

impl ApplicationContext {
    pub fn student_greeting(&self) -> &str {
        greeting_name(&self.student_first_name, &self.student_username)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewType {
    Online,
    InPerson,
    Phone,
}

impl InterviewType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::InPerson => "in_person",
            Self::Phone => "phone",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::InPerson => "In Person",
            Self::Phone => "Phone",
        }
    }
}

impl FromStr for InterviewType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "online" => Ok(Self::Online),
            "in_person" => Ok(Self::InPerson),
            "phone" => Ok(Self::Phone),
            other => Err(UnknownVariant::new("interview type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl InterviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        }
    }
}

impl FromStr for InterviewStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "rescheduled" => Ok(Self::Rescheduled),
            other => Err(UnknownVariant::new("interview status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: i64,
    pub application_id: i64,
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub interview_type: InterviewType,
    pub interviewer: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
    pub status: InterviewStatus,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewOverview {
    #[serde(flatten)]
    pub interview: Interview,
    pub job_title: String,
    pub company_name: String,
    pub student_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSeason {
    pub id: i64,
    pub year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementStatistics {
    pub id: i64,
    pub season_id: i64,
    pub department: String,
    pub total_students: i64,
    pub placed_students: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_package: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_package: Option<f64>,
    pub total_companies_visited: i64,
}

impl PlacementStatistics {
    pub fn placement_percentage(&self) -> f64 {
        percentage(self.placed_students, self.total_students)
    }
}

/// `part / total * 100`, defined as 0 for an empty population.
pub fn percentage(part: i64, total: i64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Who an announcement is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    All,
    Students,
    Companies,
    Officers,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Students => "students",
            Self::Companies => "companies",
            Self::Officers => "officers",
        }
    }
}

impl FromStr for Audience {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "students" => Ok(Self::Students),
            "companies" => Ok(Self::Companies),
            "officers" => Ok(Self::Officers),
            other => Err(UnknownVariant::new("audience", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub audience: Audience,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date_time: DateTime<Utc>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_round_trip_through_their_tags() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>(), Ok(status));
        }
        let err = "hired".parse::<ApplicationStatus>().unwrap_err();
        assert_eq!(err.kind, "application status");
        assert_eq!(err.value, "hired");
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let value = serde_json::to_value(ApplicationStatus::UnderReview).expect("serialize");
        assert_eq!(value, serde_json::json!("under_review"));
        let parsed: InterviewType = serde_json::from_str("\"in_person\"").expect("deserialize");
        assert_eq!(parsed, InterviewType::InPerson);
    }

    #[test]
    fn deadline_day_itself_is_still_open() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let job = JobPosting {
            id: 1,
            company_id: 1,
            title: "Engineer".into(),
            category_id: None,
            job_type: JobType::FullTime,
            description: String::new(),
            requirements: String::new(),
            responsibilities: String::new(),
            location: String::new(),
            salary_range: String::new(),
            application_deadline: today,
            positions_available: 1,
            status: JobStatus::Open,
            min_cgpa: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!job.deadline_passed(today));
        assert!(job.deadline_passed(today.succ_opt().unwrap()));
    }

    #[test]
    fn placement_percentage_handles_empty_department() {
        let mut stats = PlacementStatistics {
            id: 1,
            season_id: 1,
            department: "CSE".into(),
            total_students: 0,
            placed_students: 0,
            highest_package: None,
            average_package: None,
            total_companies_visited: 0,
        };
        assert_eq!(stats.placement_percentage(), 0.0);
        stats.total_students = 40;
        stats.placed_students = 30;
        assert_eq!(stats.placement_percentage(), 75.0);
    }

    #[test]
    fn stats_accumulate_per_status() {
        let mut stats = ApplicationStats::default();
        stats.record(ApplicationStatus::Applied, 3);
        stats.record(ApplicationStatus::Selected, 2);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.applied, 3);
        assert_eq!(stats.selected, 2);
        assert_eq!(stats.rejected, 0);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(display_name("", " ", "asha"), "asha");
        assert_eq!(display_name("Asha", "", "asha"), "Asha");
        assert_eq!(display_name("Asha", "Rao", "asha"), "Asha Rao");
        assert_eq!(greeting_name("  ", "asha"), "asha");
    }
}
