//! Caller-supplied drafts. They are deserialized straight from request bodies
//! and checked by [`crate::rules`] before anything is written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::actor::Role;
use crate::types::{
    ApplicationStatus, Audience, Interview, InterviewStatus, InterviewType, JobStatus, JobType,
};

fn default_true() -> bool {
    true
}

fn default_positions() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountUpdate {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentProfileUpdate {
    pub roll_number: String,
    pub department: String,
    pub year_of_graduation: i32,
    #[serde(default)]
    pub cgpa: Option<f64>,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub linkedin_profile: String,
    #[serde(default)]
    pub github_profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanyProfileUpdate {
    pub company_name: String,
    pub industry: String,
    pub description: String,
    pub website: String,
    pub address: String,
    #[serde(default)]
    pub established_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobPostingDraft {
    pub title: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub job_type: JobType,
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub responsibilities: String,
    pub location: String,
    #[serde(default)]
    pub salary_range: String,
    pub application_deadline: NaiveDate,
    #[serde(default = "default_positions")]
    pub positions_available: i64,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub min_cgpa: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewApplication {
    #[serde(default)]
    pub cover_letter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterviewDraft {
    pub date_time: DateTime<Utc>,
    pub interview_type: InterviewType,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub interviewer: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

impl InterviewDraft {
    /// Blank meeting links count as absent.
    pub fn meeting_link(&self) -> Option<&str> {
        non_blank(self.meeting_link.as_deref())
    }
}

/// Partial interview edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InterviewPatch {
    #[serde(default)]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub interview_type: Option<InterviewType>,
    #[serde(default)]
    pub interviewer: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub status: Option<InterviewStatus>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl InterviewPatch {
    /// Returns the interview as it would look after the edit.
    pub fn merge_into(&self, current: &Interview) -> Interview {
        let mut merged = current.clone();
        if let Some(date_time) = self.date_time {
            merged.date_time = date_time;
        }
        if let Some(location) = &self.location {
            merged.location = location.clone();
        }
        if let Some(interview_type) = self.interview_type {
            merged.interview_type = interview_type;
        }
        if let Some(interviewer) = &self.interviewer {
            merged.interviewer = interviewer.clone();
        }
        if let Some(notes) = &self.notes {
            merged.notes = notes.clone();
        }
        if let Some(link) = &self.meeting_link {
            merged.meeting_link = non_blank(Some(link)).map(str::to_string);
        }
        if let Some(status) = self.status {
            merged.status = status;
        }
        if let Some(feedback) = &self.feedback {
            merged.feedback = feedback.clone();
        }
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeasonDraft {
    pub year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatisticsDraft {
    pub total_students: i64,
    pub placed_students: i64,
    #[serde(default)]
    pub highest_package: Option<f64>,
    #[serde(default)]
    pub average_package: Option<f64>,
    #[serde(default)]
    pub total_companies_visited: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnnouncementDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub date_time: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
