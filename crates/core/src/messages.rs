//! Copy for in-system notifications and outgoing emails.

use chrono::{DateTime, Utc};

use crate::actor::Role;
use crate::types::{ApplicationContext, ApplicationStatus, EmailDraft, Interview, NotificationDraft};

const SIGNATURE: &str = "Campus Placement Cell";

fn format_when(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn welcome(role: Role) -> NotificationDraft {
    let message = match role {
        Role::Student => {
            "Welcome to the Campus Placement System! Complete your profile and upload your resume to start applying for jobs."
        }
        Role::Company => {
            "Welcome to the Campus Placement System! Complete your company profile to start posting job opportunities."
        }
        Role::Officer => {
            "Welcome to the Campus Placement System! You have administrator privileges to manage the placement process."
        }
    };
    NotificationDraft {
        title: "Welcome to Campus Placement System".to_string(),
        message: message.to_string(),
    }
}

/// Alert for the company that owns the posting.
pub fn application_received(job_title: &str, applicant_name: &str) -> NotificationDraft {
    NotificationDraft {
        title: format!("New Application for {job_title}"),
        message: format!("{applicant_name} has applied for the {job_title} position."),
    }
}

pub fn application_confirmation_email(
    greeting: &str,
    job_title: &str,
    company_name: &str,
) -> EmailDraft {
    EmailDraft {
        subject: "Job Application Submitted Successfully".to_string(),
        body: format!(
            "Hi {greeting},\n\n\
             You have successfully applied for the job:\n\n\
             Job Title: {job_title}\n\
             Company: {company_name}\n\n\
             Your application has been received successfully.\n\
             You will be notified when the application status changes.\n\n\
             Best Regards,\n\
             {SIGNATURE}"
        ),
    }
}

pub fn status_changed(
    job_title: &str,
    old: ApplicationStatus,
    new: ApplicationStatus,
) -> NotificationDraft {
    NotificationDraft {
        title: "Application Status Updated".to_string(),
        message: format!(
            "Your application for {job_title} has been updated from {} to {}.",
            old.as_str(),
            new.as_str()
        ),
    }
}

/// Status email with distinct copy for selections and rejections.
pub fn status_changed_email(context: &ApplicationContext, new: ApplicationStatus) -> EmailDraft {
    let greeting = context.student_greeting();
    let job_title = &context.job_title;
    let company_name = &context.company_name;
    match new {
        ApplicationStatus::Selected => EmailDraft {
            subject: "Congratulations! You Are Selected".to_string(),
            body: format!(
                "Hi {greeting},\n\n\
                 Congratulations!\n\n\
                 You have been SELECTED for:\n\
                 Job Title: {job_title}\n\
                 Company: {company_name}\n\n\
                 The company or placement team will contact you soon.\n\n\
                 Best Wishes,\n\
                 {SIGNATURE}"
            ),
        },
        ApplicationStatus::Rejected => EmailDraft {
            subject: "Application Status Update".to_string(),
            body: format!(
                "Hi {greeting},\n\n\
                 We regret to inform you that your application for:\n\
                 {job_title} at {company_name}\n\
                 has been rejected.\n\n\
                 Keep applying, success is near.\n\n\
                 {SIGNATURE}"
            ),
        },
        other => EmailDraft {
            subject: "Application Status Updated".to_string(),
            body: format!(
                "Hi {greeting},\n\n\
                 Your application status has been updated.\n\n\
                 Job: {job_title}\n\
                 Company: {company_name}\n\
                 New Status: {}\n\n\
                 Login to your dashboard for more details.\n\n\
                 {SIGNATURE}",
                other.label()
            ),
        },
    }
}

pub fn interview_scheduled(job_title: &str, at: DateTime<Utc>) -> NotificationDraft {
    NotificationDraft {
        title: format!("Interview Scheduled for {job_title}"),
        message: format!(
            "You have been scheduled for an interview on {}. Please check your interview details.",
            format_when(at)
        ),
    }
}

pub fn interview_scheduled_email(context: &ApplicationContext, interview: &Interview) -> EmailDraft {
    EmailDraft {
        subject: "Interview Scheduled".to_string(),
        body: format!(
            "Hi {},\n\n\
             Your interview has been scheduled.\n\n\
             Job Title: {}\n\
             Company: {}\n\n\
             Interview Details:\n\
             Date & Time: {}\n\
             Mode: {}\n\
             Interviewer: {}\n\
             Meeting Link: {}\n\
             Location: {}\n\n\
             Please be available on time.\n\n\
             All the best,\n\
             {SIGNATURE}",
            context.student_greeting(),
            context.job_title,
            context.company_name,
            format_when(interview.date_time),
            interview.interview_type.label(),
            or_dash(&interview.interviewer),
            or_dash(interview.meeting_link.as_deref().unwrap_or_default()),
            or_dash(&interview.location),
        ),
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

pub fn interview_feedback_available(company_name: &str) -> NotificationDraft {
    NotificationDraft {
        title: "Interview Feedback Available".to_string(),
        message: format!("Feedback for your interview with {company_name} is now available."),
    }
}

/// Alert for placement officers when a company publishes a posting.
pub fn job_posted(company_name: &str, job_title: &str) -> NotificationDraft {
    NotificationDraft {
        title: format!("New Job Posted: {job_title}"),
        message: format!("{company_name} has posted a new job: {job_title}"),
    }
}
