use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use placement_core::inputs::AccountUpdate;
use placement_core::types::Account;
use placement_core::Role;

use crate::{map_write_error, to_rfc3339, StorageError};

const ACCOUNT_COLUMNS: &str =
    "id, username, email, first_name, last_name, phone_number, role, created_at, provisioned_at";

/// Repository for the `accounts` table.
#[derive(Clone)]
pub struct AccountRepository {
    pub(crate) pool: SqlitePool,
}

/// Data required to create an account row.
pub struct NewAccountRecord<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: Option<&'a str>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl AccountRepository {
    /// Inserts the account. Username and email collisions surface as `Duplicate`.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        record: &NewAccountRecord<'_>,
    ) -> Result<Account, StorageError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "INSERT INTO accounts \
             (username, email, first_name, last_name, phone_number, role, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(record.username)
        .bind(record.email)
        .bind(record.first_name)
        .bind(record.last_name)
        .bind(record.phone_number)
        .bind(record.role.as_str())
        .bind(to_rfc3339(record.created_at))
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?;

        row.into_domain()
    }

    pub async fn fetch(&self, account_id: i64) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AccountRow::into_domain).transpose()
    }

    /// Claims the one-time provisioning slot for the account.
    ///
    /// Returns `false` when the account was already provisioned, in which case
    /// the caller must not create any records.
    pub async fn mark_provisioned(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE accounts SET provisioned_at = ? WHERE id = ? AND provisioned_at IS NULL",
        )
        .bind(to_rfc3339(at))
        .bind(account_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Updates contact details. The role is never touched.
    pub async fn update_details(
        &self,
        account_id: i64,
        update: &AccountUpdate,
    ) -> Result<Option<Account>, StorageError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts \
             SET email = ?, first_name = ?, last_name = ?, phone_number = ? \
             WHERE id = ? \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(update.email.trim())
        .bind(update.first_name.trim())
        .bind(update.last_name.trim())
        .bind(update.phone_number.as_deref())
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.map(AccountRow::into_domain).transpose()
    }

    /// Ids of every account holding `role`, oldest first.
    pub async fn ids_with_role(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        role: Role,
    ) -> Result<Vec<i64>, StorageError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM accounts WHERE role = ? ORDER BY id")
            .bind(role.as_str())
            .fetch_all(&mut **tx)
            .await?;
        Ok(ids)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    provisioned_at: Option<DateTime<Utc>>,
}

impl AccountRow {
    fn into_domain(self) -> Result<Account, StorageError> {
        Ok(Account {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            role: self.role.parse()?,
            created_at: self.created_at,
            provisioned_at: self.provisioned_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use placement_core::inputs::AccountUpdate;
    use placement_core::Role;

    #[tokio::test]
    async fn provisioning_slot_is_claimed_once() {
        let (_dir, db) = setup_db().await;
        let account = account(&db, "kiran", Role::Student).await;
        assert!(account.provisioned_at.is_none());

        let mut tx = db.begin().await.expect("begin");
        let first = db
            .accounts()
            .mark_provisioned(&mut tx, account.id, at(9))
            .await
            .expect("mark");
        let second = db
            .accounts()
            .mark_provisioned(&mut tx, account.id, at(10))
            .await
            .expect("mark again");
        tx.commit().await.expect("commit");

        assert!(first);
        assert!(!second);
        let stored = db.accounts().fetch(account.id).await.expect("fetch").expect("exists");
        assert_eq!(stored.provisioned_at, Some(at(9)));
    }

    #[tokio::test]
    async fn update_keeps_role_and_rejects_taken_email() {
        let (_dir, db) = setup_db().await;
        let first = account(&db, "meena", Role::Company).await;
        account(&db, "arjun", Role::Student).await;

        let updated = db
            .accounts()
            .update_details(
                first.id,
                &AccountUpdate {
                    email: "hr@meena.example".into(),
                    first_name: "Meena".into(),
                    last_name: "Rao".into(),
                    phone_number: Some("+91 98450 00000".into()),
                },
            )
            .await
            .expect("update")
            .expect("exists");
        assert_eq!(updated.role, Role::Company);
        assert_eq!(updated.email, "hr@meena.example");

        let err = db
            .accounts()
            .update_details(
                first.id,
                &AccountUpdate {
                    email: "arjun@example.edu".into(),
                    first_name: String::new(),
                    last_name: String::new(),
                    phone_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_duplicate_on("accounts.email"));
    }

    #[tokio::test]
    async fn lists_accounts_by_role() {
        let (_dir, db) = setup_db().await;
        let officer = account(&db, "dean", Role::Officer).await;
        account(&db, "student", Role::Student).await;

        let mut tx = db.begin().await.expect("begin");
        let ids = db
            .accounts()
            .ids_with_role(&mut tx, Role::Officer)
            .await
            .expect("list");
        assert_eq!(ids, vec![officer.id]);
    }
}
