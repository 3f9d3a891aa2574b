use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Audience, UnknownVariant};

/// Role tag chosen at registration. There is no transition between roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Company,
    Officer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Company => "company",
            Self::Officer => "officer",
        }
    }

    /// Announcement audience matching this role, besides [`Audience::All`].
    pub fn audience(self) -> Audience {
        match self {
            Self::Student => Audience::Students,
            Self::Company => Audience::Companies,
            Self::Officer => Audience::Officers,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "student" => Ok(Self::Student),
            "company" => Ok(Self::Company),
            "officer" => Ok(Self::Officer),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// Authenticated caller together with the profile it acts through.
///
/// Students and companies always carry their profile id because provisioning
/// creates the profile in the same transaction as the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Student { account_id: i64, student_id: i64 },
    Company { account_id: i64, company_id: i64 },
    Officer { account_id: i64 },
}

impl Actor {
    pub fn account_id(&self) -> i64 {
        match *self {
            Self::Student { account_id, .. }
            | Self::Company { account_id, .. }
            | Self::Officer { account_id } => account_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Student { .. } => Role::Student,
            Self::Company { .. } => Role::Company,
            Self::Officer { .. } => Role::Officer,
        }
    }

    /// Returns the student profile id or refuses `action` for other roles.
    pub fn require_student(&self, action: &'static str) -> Result<i64, AccessError> {
        match *self {
            Self::Student { student_id, .. } => Ok(student_id),
            _ => Err(AccessError::RoleRequired {
                action,
                required: Role::Student,
            }),
        }
    }

    /// Returns the company profile id or refuses `action` for other roles.
    pub fn require_company(&self, action: &'static str) -> Result<i64, AccessError> {
        match *self {
            Self::Company { company_id, .. } => Ok(company_id),
            _ => Err(AccessError::RoleRequired {
                action,
                required: Role::Company,
            }),
        }
    }

    pub fn require_officer(&self, action: &'static str) -> Result<(), AccessError> {
        match self {
            Self::Officer { .. } => Ok(()),
            _ => Err(AccessError::RoleRequired {
                action,
                required: Role::Officer,
            }),
        }
    }

    /// Officers manage every posting; companies only their own.
    pub fn can_manage(&self, company_id: i64) -> bool {
        match *self {
            Self::Officer { .. } => true,
            Self::Company {
                company_id: own, ..
            } => own == company_id,
            Self::Student { .. } => false,
        }
    }

    pub fn ensure_can_manage(
        &self,
        company_id: i64,
        action: &'static str,
    ) -> Result<(), AccessError> {
        if self.can_manage(company_id) {
            Ok(())
        } else {
            Err(AccessError::NotOwner { action })
        }
    }

    /// Restricts record listings to what the caller may see.
    pub fn scope(&self) -> RecordScope {
        match *self {
            Self::Student { student_id, .. } => RecordScope::Student(student_id),
            Self::Company { company_id, .. } => RecordScope::Company(company_id),
            Self::Officer { .. } => RecordScope::All,
        }
    }
}

/// Visibility filter applied to application and interview listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    Student(i64),
    Company(i64),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("only {required} accounts may {action}")]
    RoleRequired { action: &'static str, required: Role },
    #[error("only the owning company or a placement officer may {action}")]
    NotOwner { action: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY: Actor = Actor::Company {
        account_id: 10,
        company_id: 3,
    };
    const OFFICER: Actor = Actor::Officer { account_id: 1 };
    const STUDENT: Actor = Actor::Student {
        account_id: 20,
        student_id: 7,
    };

    #[test]
    fn officers_and_owning_companies_manage_postings() {
        assert!(OFFICER.can_manage(3));
        assert!(OFFICER.can_manage(99));
        assert!(COMPANY.can_manage(3));
        assert!(!COMPANY.can_manage(4));
        assert!(!STUDENT.can_manage(3));

        let err = COMPANY.ensure_can_manage(4, "update applications").unwrap_err();
        assert_eq!(
            err.to_string(),
            "only the owning company or a placement officer may update applications"
        );
    }

    #[test]
    fn role_requirements_name_the_missing_role() {
        assert_eq!(STUDENT.require_student("apply"), Ok(7));
        let err = COMPANY.require_student("apply").unwrap_err();
        assert_eq!(err.to_string(), "only student accounts may apply");
        assert!(OFFICER.require_officer("create seasons").is_ok());
        assert!(STUDENT.require_company("post jobs").is_err());
    }

    #[test]
    fn scope_follows_role() {
        assert_eq!(STUDENT.scope(), RecordScope::Student(7));
        assert_eq!(COMPANY.scope(), RecordScope::Company(3));
        assert_eq!(OFFICER.scope(), RecordScope::All);
        assert_eq!(COMPANY.role().audience(), Audience::Companies);
    }

    #[test]
    fn roles_parse_from_tags() {
        assert_eq!("officer".parse::<Role>(), Ok(Role::Officer));
        assert!("admin".parse::<Role>().is_err());
    }
}
