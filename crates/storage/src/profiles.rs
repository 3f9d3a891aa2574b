use sqlx::{Sqlite, SqlitePool, Transaction};

use placement_core::inputs::{CompanyProfileUpdate, StudentProfileUpdate};
use placement_core::provisioning::{CompanyProfileSeed, StudentProfileSeed};
use placement_core::types::{CompanyProfile, StudentProfile};

use crate::{map_write_error, StorageError};

const STUDENT_COLUMNS: &str = "id, account_id, roll_number, department, year_of_graduation, \
     cgpa, skills, bio, linkedin_profile, github_profile";

const COMPANY_COLUMNS: &str =
    "id, account_id, company_name, industry, description, website, address, established_year";

/// Repository for student and company profiles.
#[derive(Clone)]
pub struct ProfileRepository {
    pub(crate) pool: SqlitePool,
}

impl ProfileRepository {
    /// Creates the placeholder student profile. Returns `false` if the account already has one.
    pub async fn insert_student(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account_id: i64,
        seed: &StudentProfileSeed,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO student_profiles (account_id, roll_number, department, year_of_graduation) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(account_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(&seed.roll_number)
        .bind(&seed.department)
        .bind(seed.year_of_graduation)
        .execute(&mut **tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.rows_affected() == 1)
    }

    /// Creates the placeholder company profile. Returns `false` if the account already has one.
    pub async fn insert_company(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account_id: i64,
        seed: &CompanyProfileSeed,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO company_profiles \
             (account_id, company_name, industry, description, website, address) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(account_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(&seed.company_name)
        .bind(&seed.industry)
        .bind(&seed.description)
        .bind(&seed.website)
        .bind(&seed.address)
        .execute(&mut **tx)
        .await
        .map_err(map_write_error)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn student_by_account(
        &self,
        account_id: i64,
    ) -> Result<Option<StudentProfile>, StorageError> {
        let row = sqlx::query_as::<_, StudentProfileRow>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE account_id = ?"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StudentProfileRow::into_domain))
    }

    pub async fn company_by_account(
        &self,
        account_id: i64,
    ) -> Result<Option<CompanyProfile>, StorageError> {
        let row = sqlx::query_as::<_, CompanyProfileRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM company_profiles WHERE account_id = ?"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CompanyProfileRow::into_domain))
    }

    pub async fn company(&self, company_id: i64) -> Result<Option<CompanyProfile>, StorageError> {
        let row = sqlx::query_as::<_, CompanyProfileRow>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM company_profiles WHERE id = ?"
        ))
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CompanyProfileRow::into_domain))
    }

    /// Replaces the editable student fields. A taken roll number surfaces as `Duplicate`.
    pub async fn update_student(
        &self,
        account_id: i64,
        update: &StudentProfileUpdate,
    ) -> Result<Option<StudentProfile>, StorageError> {
        let row = sqlx::query_as::<_, StudentProfileRow>(&format!(
            "UPDATE student_profiles \
             SET roll_number = ?, department = ?, year_of_graduation = ?, cgpa = ?, \
                 skills = ?, bio = ?, linkedin_profile = ?, github_profile = ? \
             WHERE account_id = ? \
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(update.roll_number.trim())
        .bind(update.department.trim())
        .bind(update.year_of_graduation)
        .bind(update.cgpa)
        .bind(&update.skills)
        .bind(&update.bio)
        .bind(update.linkedin_profile.trim())
        .bind(update.github_profile.trim())
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.map(StudentProfileRow::into_domain))
    }

    pub async fn update_company(
        &self,
        account_id: i64,
        update: &CompanyProfileUpdate,
    ) -> Result<Option<CompanyProfile>, StorageError> {
        let row = sqlx::query_as::<_, CompanyProfileRow>(&format!(
            "UPDATE company_profiles \
             SET company_name = ?, industry = ?, description = ?, website = ?, address = ?, \
                 established_year = ? \
             WHERE account_id = ? \
             RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(update.company_name.trim())
        .bind(update.industry.trim())
        .bind(&update.description)
        .bind(update.website.trim())
        .bind(&update.address)
        .bind(update.established_year)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.map(CompanyProfileRow::into_domain))
    }

    pub async fn count_students(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM student_profiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_companies(&self) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM company_profiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StudentProfileRow {
    id: i64,
    account_id: i64,
    roll_number: String,
    department: String,
    year_of_graduation: i32,
    cgpa: Option<f64>,
    skills: String,
    bio: String,
    linkedin_profile: String,
    github_profile: String,
}

impl StudentProfileRow {
    fn into_domain(self) -> StudentProfile {
        StudentProfile {
            id: self.id,
            account_id: self.account_id,
            roll_number: self.roll_number,
            department: self.department,
            year_of_graduation: self.year_of_graduation,
            cgpa: self.cgpa,
            skills: self.skills,
            bio: self.bio,
            linkedin_profile: self.linkedin_profile,
            github_profile: self.github_profile,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyProfileRow {
    id: i64,
    account_id: i64,
    company_name: String,
    industry: String,
    description: String,
    website: String,
    address: String,
    established_year: Option<i32>,
}

impl CompanyProfileRow {
    fn into_domain(self) -> CompanyProfile {
        CompanyProfile {
            id: self.id,
            account_id: self.account_id,
            company_name: self.company_name,
            industry: self.industry,
            description: self.description,
            website: self.website,
            address: self.address,
            established_year: self.established_year,
        }
    }
}
