use chrono::{Datelike, NaiveDate};

use crate::actor::Role;
use crate::messages;
use crate::types::{Account, NotificationDraft};

/// Years between registration and the placeholder graduation year.
const DEFAULT_PROGRAM_YEARS: i32 = 4;

const PLACEHOLDER_ROLL_PREFIX: &str = "TEMP";

/// Placeholder student profile written at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfileSeed {
    pub roll_number: String,
    pub department: String,
    pub year_of_graduation: i32,
}

/// Placeholder company profile written at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyProfileSeed {
    pub company_name: String,
    pub industry: String,
    pub description: String,
    pub website: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSeed {
    Student(StudentProfileSeed),
    Company(CompanyProfileSeed),
}

/// Records to create for a freshly registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPlan {
    pub profile: Option<ProfileSeed>,
    pub welcome: NotificationDraft,
}

impl ProvisioningPlan {
    /// Builds the plan for `account`. Officers get no profile, only the welcome message.
    pub fn for_account(account: &Account, today: NaiveDate) -> Self {
        let profile = match account.role {
            Role::Student => Some(ProfileSeed::Student(StudentProfileSeed {
                roll_number: placeholder_roll_number(account.id),
                department: "Not Specified".to_string(),
                year_of_graduation: today.year() + DEFAULT_PROGRAM_YEARS,
            })),
            Role::Company => Some(ProfileSeed::Company(CompanyProfileSeed {
                company_name: format!("{}'s Company", account.username),
                industry: "Not Specified".to_string(),
                description: "Company description not provided yet.".to_string(),
                website: "https://example.com".to_string(),
                address: "Address not provided yet.".to_string(),
            })),
            Role::Officer => None,
        };

        Self {
            profile,
            welcome: messages::welcome(account.role),
        }
    }
}

/// Roll number used until the student fills in the real one.
pub fn placeholder_roll_number(account_id: i64) -> String {
    format!("{PLACEHOLDER_ROLL_PREFIX}{account_id}")
}

/// True for values in the `TEMP<digits>` space reserved for placeholders.
pub fn is_placeholder_roll_number(value: &str) -> bool {
    value
        .strip_prefix(PLACEHOLDER_ROLL_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(id: i64, role: Role) -> Account {
        Account {
            id,
            username: "nova".into(),
            email: "nova@example.edu".into(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            role,
            created_at: Utc::now(),
            provisioned_at: None,
        }
    }

    #[test]
    fn student_plan_uses_account_derived_placeholders() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let plan = ProvisioningPlan::for_account(&account(42, Role::Student), today);
        match plan.profile {
            Some(ProfileSeed::Student(seed)) => {
                assert_eq!(seed.roll_number, "TEMP42");
                assert_eq!(seed.department, "Not Specified");
                assert_eq!(seed.year_of_graduation, 2030);
            }
            other => panic!("unexpected profile: {other:?}"),
        }
        assert!(plan.welcome.message.contains("upload your resume"));
    }

    #[test]
    fn company_plan_names_company_after_username() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let plan = ProvisioningPlan::for_account(&account(7, Role::Company), today);
        match plan.profile {
            Some(ProfileSeed::Company(seed)) => {
                assert_eq!(seed.company_name, "nova's Company");
                assert_eq!(seed.website, "https://example.com");
            }
            other => panic!("unexpected profile: {other:?}"),
        }
    }

    #[test]
    fn officer_plan_has_only_a_welcome() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let plan = ProvisioningPlan::for_account(&account(1, Role::Officer), today);
        assert!(plan.profile.is_none());
        assert_eq!(plan.welcome.title, "Welcome to Campus Placement System");
        assert!(plan.welcome.message.contains("administrator privileges"));
    }
}
