//! Postgres-backed account repository and refresh credential store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use medigate_accounts::{
    AccountProfile, AccountRepository, DoctorDetail, RefreshCredential, RefreshCredentialStore,
    RepositoryError, RequestOrigin, Schedule, StaffProfile, StaffProfileUpsert, StaffRole,
};
use medigate_core::{IdentityId, RefreshCredentialId, Result};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Row type for customer queries.
#[derive(FromRow)]
struct CustomerRow {
    customer_id: String,
    email: Option<String>,
    phone: Option<String>,
    full_name: Option<String>,
    sex_identify: Option<String>,
    login_type: String,
    is_email_verified: bool,
    is_phone_verified: bool,
    status: String,
    create_at: DateTime<Utc>,
    update_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_account(self) -> AccountProfile {
        AccountProfile {
            customer_id: IdentityId::new(self.customer_id),
            email: self.email,
            phone: self.phone,
            full_name: self.full_name,
            sex_identify: self.sex_identify,
            login_type: self.login_type,
            is_email_verified: self.is_email_verified,
            is_phone_verified: self.is_phone_verified,
            status: self.status.into(),
            create_at: self.create_at,
            update_at: self.update_at,
        }
    }
}

/// Row type for staff queries.
#[derive(FromRow)]
struct StaffRow {
    staff_id: String,
    full_name: String,
    working_email: String,
    role: String,
    years_experience: i32,
    hired_at: NaiveDate,
    is_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StaffRow {
    fn try_into_profile(self) -> Result<StaffProfile, RepositoryError> {
        let role = StaffRole::from_str(&self.role).map_err(|e| RepositoryError::Decode {
            entity: "staff member",
            details: e.to_string(),
        })?;
        Ok(StaffProfile {
            staff_id: IdentityId::new(self.staff_id),
            full_name: self.full_name,
            working_email: self.working_email,
            role,
            years_experience: self.years_experience,
            hired_at: self.hired_at,
            is_available: self.is_available,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct DoctorRow {
    doctor_id: String,
    department: String,
    speciality: String,
    license_no: String,
}

impl DoctorRow {
    fn into_detail(self) -> DoctorDetail {
        DoctorDetail {
            doctor_id: IdentityId::new(self.doctor_id),
            department: self.department,
            speciality: self.speciality,
            license_no: self.license_no,
        }
    }
}

/// Row type for refresh credential queries.
#[derive(FromRow)]
struct RefreshRow {
    id: String,
    customer_id: String,
    token: String,
    expires_at: DateTime<Utc>,
    is_revoked: bool,
    created_at: DateTime<Utc>,
    user_agent: Option<String>,
    ip_address: Option<String>,
}

impl RefreshRow {
    fn try_into_credential(self) -> Result<RefreshCredential, RepositoryError> {
        let id = RefreshCredentialId::from_str(&self.id).map_err(|e| RepositoryError::Decode {
            entity: "refresh token",
            details: format!("invalid id '{}': {}", self.id, e),
        })?;
        Ok(RefreshCredential {
            id,
            customer_id: IdentityId::new(self.customer_id),
            token: self.token,
            expires_at: self.expires_at,
            is_revoked: self.is_revoked,
            created_at: self.created_at,
            origin: RequestOrigin {
                user_agent: self.user_agent,
                ip_address: self.ip_address,
            },
        })
    }
}

/// Maps a driver error onto the repository taxonomy.
fn query_error(operation: &'static str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => RepositoryError::Unavailable {
            details: err.to_string(),
        },
        _ => RepositoryError::Query {
            operation,
            details: err.to_string(),
        },
    }
}

/// Account and refresh credential storage on a Postgres pool.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_credential<'e, E>(
        executor: E,
        credential: &RefreshCredential,
    ) -> std::result::Result<(), sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, customer_id, token, expires_at, is_revoked, created_at, user_agent, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(credential.id.to_string())
        .bind(credential.customer_id.as_str())
        .bind(&credential.token)
        .bind(credential.expires_at)
        .bind(credential.is_revoked)
        .bind(credential.created_at)
        .bind(credential.origin.user_agent.as_deref())
        .bind(credential.origin.ip_address.as_deref())
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_account(&self, id: &IdentityId) -> Result<AccountProfile, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT customer_id, email, phone, full_name, sex_identify, login_type,
                   is_email_verified, is_phone_verified, status, create_at, update_at
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("find customer", e))?;

        match row {
            Some(row) => Ok(row.into_account()),
            None => Err(RepositoryError::NotFound {
                entity: "customer",
                key: id.to_string(),
            }
            .into()),
        }
    }

    async fn insert_account(&self, account: &AccountProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO customers
                (customer_id, email, phone, full_name, sex_identify, login_type,
                 is_email_verified, is_phone_verified, status, create_at, update_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.customer_id.as_str())
        .bind(account.email.as_deref())
        .bind(account.phone.as_deref())
        .bind(account.full_name.as_deref())
        .bind(account.sex_identify.as_deref())
        .bind(&account.login_type)
        .bind(account.is_email_verified)
        .bind(account.is_phone_verified)
        .bind(account.status.as_str())
        .bind(account.create_at)
        .bind(account.update_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                return RepositoryError::Conflict {
                    entity: "customer",
                    key: account.customer_id.to_string(),
                };
            }
            query_error("insert customer", e)
        })?;
        Ok(())
    }

    async fn touch_account(
        &self,
        id: &IdentityId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE customers SET update_at = $2 WHERE customer_id = $1")
            .bind(id.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("touch customer", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound {
                entity: "customer",
                key: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn upsert_staff_profile(
        &self,
        staff: StaffProfileUpsert,
    ) -> Result<StaffProfile, RepositoryError> {
        let profile = staff.into_new_profile();
        let row: StaffRow = sqlx::query_as(
            r#"
            INSERT INTO staff_members
                (staff_id, full_name, working_email, role, years_experience, hired_at,
                 is_available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (staff_id) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                working_email = EXCLUDED.working_email,
                role = EXCLUDED.role,
                years_experience = EXCLUDED.years_experience,
                hired_at = EXCLUDED.hired_at,
                is_available = EXCLUDED.is_available,
                updated_at = EXCLUDED.updated_at
            RETURNING staff_id, full_name, working_email, role, years_experience, hired_at,
                      is_available, created_at, updated_at
            "#,
        )
        .bind(profile.staff_id.as_str())
        .bind(&profile.full_name)
        .bind(&profile.working_email)
        .bind(profile.role.as_str())
        .bind(profile.years_experience)
        .bind(profile.hired_at)
        .bind(profile.is_available)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_error("upsert staff member", e))?;

        row.try_into_profile()
    }

    async fn upsert_doctor_detail(
        &self,
        detail: DoctorDetail,
    ) -> Result<DoctorDetail, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row.
        let row: DoctorRow = sqlx::query_as(
            r#"
            INSERT INTO doctor_details (doctor_id, department, speciality, license_no)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (doctor_id) DO UPDATE SET doctor_id = doctor_details.doctor_id
            RETURNING doctor_id, department, speciality, license_no
            "#,
        )
        .bind(detail.doctor_id.as_str())
        .bind(&detail.department)
        .bind(&detail.speciality)
        .bind(&detail.license_no)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_error("upsert doctor detail", e))?;

        Ok(row.into_detail())
    }

    async fn remove_doctor_detail(&self, doctor_id: &IdentityId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM doctor_details WHERE doctor_id = $1")
            .bind(doctor_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("remove doctor detail", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO staff_schedules (schedule_id, staff_id, start_time, end_time, is_recurring)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(schedule.schedule_id.to_string())
        .bind(schedule.staff_id.as_str())
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.is_recurring)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("insert schedule", e))?;
        Ok(())
    }
}

#[async_trait]
impl RefreshCredentialStore for PgAccountRepository {
    async fn find_active(
        &self,
        owner: &IdentityId,
        now: DateTime<Utc>,
    ) -> Result<RefreshCredential, RepositoryError> {
        let row: Option<RefreshRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, token, expires_at, is_revoked, created_at, user_agent, ip_address
            FROM refresh_tokens
            WHERE customer_id = $1 AND NOT is_revoked AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(owner.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("find active refresh token", e))?;

        match row {
            Some(row) => Ok(row.try_into_credential()?),
            None => Err(RepositoryError::NotFound {
                entity: "refresh token",
                key: owner.to_string(),
            }
            .into()),
        }
    }

    async fn insert(&self, credential: &RefreshCredential) -> Result<(), RepositoryError> {
        Self::insert_credential(&self.pool, credential)
            .await
            .map_err(|e| query_error("insert refresh token", e))?;
        Ok(())
    }

    async fn rotate(&self, credential: &RefreshCredential) -> Result<u64, RepositoryError> {
        let owner = credential.customer_id.as_str();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_error("begin refresh rotation", e))?;

        // Concurrent rotations for one owner queue on the customer row.
        let locked: Option<(String,)> =
            sqlx::query_as("SELECT customer_id FROM customers WHERE customer_id = $1 FOR UPDATE")
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| query_error("lock customer", e))?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound {
                entity: "customer",
                key: owner.to_string(),
            }
            .into());
        }

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE WHERE customer_id = $1 AND NOT is_revoked",
        )
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(|e| query_error("revoke refresh tokens", e))?
        .rows_affected();

        Self::insert_credential(&mut *tx, credential)
            .await
            .map_err(|e| query_error("insert refresh token", e))?;

        tx.commit()
            .await
            .map_err(|e| query_error("commit refresh rotation", e))?;

        Ok(revoked)
    }
}
