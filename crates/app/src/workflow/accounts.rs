use chrono::Datelike;
use metrics::counter;
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use tracing::info;

use placement_core::inputs::{
    AccountUpdate, CompanyProfileUpdate, NewAccount, StudentProfileUpdate,
};
use placement_core::provisioning::{ProfileSeed, ProvisioningPlan};
use placement_core::rules;
use placement_core::types::{Account, CompanyProfile, StudentProfile};
use placement_core::{Actor, Role};
use placement_storage::NewAccountRecord;

use super::{conflicts, PlacementService, WorkflowError};

const ACCOUNT_CONFLICTS: &[super::ConflictRule] = &[
    (
        "accounts.username",
        "username",
        "A user with that username already exists.",
    ),
    (
        "accounts.email",
        "email",
        "A user with that email already exists.",
    ),
];

const ROLL_NUMBER_CONFLICT: &[super::ConflictRule] = &[(
    "student_profiles.roll_number",
    "roll_number",
    "Student profile with this roll number already exists.",
)];

/// Account together with its role profile, when the role has one.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub account: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyProfile>,
}

impl PlacementService {
    /// Creates the account and provisions it in the same transaction.
    pub async fn register(&self, draft: NewAccount) -> Result<Account, WorkflowError> {
        rules::validate_registration(&draft)?;

        let mut tx = self.database.begin().await?;
        let record = NewAccountRecord {
            username: draft.username.trim(),
            email: draft.email.trim(),
            first_name: draft.first_name.trim(),
            last_name: draft.last_name.trim(),
            phone_number: draft.phone_number.as_deref().map(str::trim),
            role: draft.role,
            created_at: self.now(),
        };
        let account = self
            .database
            .accounts()
            .insert(&mut tx, &record)
            .await
            .map_err(|err| conflicts(err, ACCOUNT_CONFLICTS))?;
        self.provision(&mut tx, &account).await?;
        tx.commit().await?;

        counter!("accounts_registered_total", "role" => account.role.as_str()).increment(1);
        info!(
            stage = "provisioning",
            account_id = account.id,
            role = %account.role,
            "account registered"
        );
        Ok(account)
    }

    /// Writes the role profile and the welcome notification.
    ///
    /// Returns `false` without writing anything when the account was already
    /// provisioned.
    pub(crate) async fn provision(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account: &Account,
    ) -> Result<bool, WorkflowError> {
        let accounts = self.database.accounts();
        if !accounts.mark_provisioned(tx, account.id, self.now()).await? {
            info!(
                stage = "provisioning",
                account_id = account.id,
                "account already provisioned"
            );
            return Ok(false);
        }

        let plan = ProvisioningPlan::for_account(account, self.today());
        let profiles = self.database.profiles();
        match &plan.profile {
            Some(ProfileSeed::Student(seed)) => {
                profiles
                    .insert_student(tx, account.id, seed)
                    .await
                    .map_err(|err| conflicts(err, ROLL_NUMBER_CONFLICT))?;
            }
            Some(ProfileSeed::Company(seed)) => {
                profiles.insert_company(tx, account.id, seed).await?;
            }
            None => {}
        }
        self.notify(tx, account.id, &plan.welcome, "welcome").await?;
        Ok(true)
    }

    /// Builds the actor for a token subject. The stored role must match `role`.
    pub async fn resolve_actor(&self, account_id: i64, role: Role) -> Result<Actor, WorkflowError> {
        let account = self
            .database
            .accounts()
            .fetch(account_id)
            .await?
            .ok_or(WorkflowError::Unauthenticated("unknown account"))?;
        if account.role != role {
            return Err(WorkflowError::Unauthenticated("role does not match account"));
        }

        let profiles = self.database.profiles();
        let actor = match role {
            Role::Student => Actor::Student {
                account_id,
                student_id: profiles
                    .student_by_account(account_id)
                    .await?
                    .ok_or(WorkflowError::NotFound("student profile"))?
                    .id,
            },
            Role::Company => Actor::Company {
                account_id,
                company_id: profiles
                    .company_by_account(account_id)
                    .await?
                    .ok_or(WorkflowError::NotFound("company profile"))?
                    .id,
            },
            Role::Officer => Actor::Officer { account_id },
        };
        Ok(actor)
    }

    pub async fn profile(&self, actor: Actor) -> Result<ProfileView, WorkflowError> {
        let account_id = actor.account_id();
        let account = self
            .database
            .accounts()
            .fetch(account_id)
            .await?
            .ok_or(WorkflowError::NotFound("account"))?;

        let profiles = self.database.profiles();
        let mut view = ProfileView {
            account,
            student: None,
            company: None,
        };
        match actor.role() {
            Role::Student => {
                view.student = Some(
                    profiles
                        .student_by_account(account_id)
                        .await?
                        .ok_or(WorkflowError::NotFound("student profile"))?,
                );
            }
            Role::Company => {
                view.company = Some(
                    profiles
                        .company_by_account(account_id)
                        .await?
                        .ok_or(WorkflowError::NotFound("company profile"))?,
                );
            }
            Role::Officer => {}
        }
        Ok(view)
    }

    pub async fn update_account(
        &self,
        actor: Actor,
        update: AccountUpdate,
    ) -> Result<Account, WorkflowError> {
        rules::validate_account_update(&update)?;
        self.database
            .accounts()
            .update_details(actor.account_id(), &update)
            .await
            .map_err(|err| conflicts(err, ACCOUNT_CONFLICTS))?
            .ok_or(WorkflowError::NotFound("account"))
    }

    pub async fn update_student_profile(
        &self,
        actor: Actor,
        update: StudentProfileUpdate,
    ) -> Result<StudentProfile, WorkflowError> {
        actor.require_student("edit student profiles")?;
        rules::validate_student_profile(&update, actor.account_id())?;
        self.database
            .profiles()
            .update_student(actor.account_id(), &update)
            .await
            .map_err(|err| conflicts(err, ROLL_NUMBER_CONFLICT))?
            .ok_or(WorkflowError::NotFound("student profile"))
    }

    pub async fn update_company_profile(
        &self,
        actor: Actor,
        update: CompanyProfileUpdate,
    ) -> Result<CompanyProfile, WorkflowError> {
        actor.require_company("edit company profiles")?;
        rules::validate_company_profile(&update, self.today().year())?;
        self.database
            .profiles()
            .update_company(actor.account_id(), &update)
            .await?
            .ok_or(WorkflowError::NotFound("company profile"))
    }
}
