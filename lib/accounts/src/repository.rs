//! Repository capabilities consumed by the gateway.

use crate::account::AccountProfile;
use crate::error::RepositoryError;
use crate::refresh::RefreshCredential;
use crate::staff::{DoctorDetail, Schedule, StaffProfile, StaffProfileUpsert};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medigate_core::{IdentityId, Result};

/// Storage for account profiles and the staff records provisioned by OAuth
/// logins. Every row is keyed by the identity ID.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Loads the account profile for an identity.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no profile exists, other variants on failure.
    async fn find_account(&self, id: &IdentityId) -> Result<AccountProfile, RepositoryError>;

    /// Inserts a new account profile.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a profile already exists for the identity.
    async fn insert_account(&self, account: &AccountProfile) -> Result<(), RepositoryError>;

    /// Sets the profile's `update_at` timestamp. Status is never changed.
    async fn touch_account(
        &self,
        id: &IdentityId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Inserts or updates the staff profile keyed by `staff_id`.
    ///
    /// Idempotent: repeating the call with the same values leaves exactly one
    /// row. Returns the stored row after the write.
    async fn upsert_staff_profile(
        &self,
        staff: StaffProfileUpsert,
    ) -> Result<StaffProfile, RepositoryError>;

    /// Inserts the doctor detail keyed by `doctor_id` unless one exists.
    ///
    /// An existing row is returned unchanged, so its licence number is never
    /// regenerated.
    async fn upsert_doctor_detail(
        &self,
        detail: DoctorDetail,
    ) -> Result<DoctorDetail, RepositoryError>;

    /// Deletes the doctor detail of `doctor_id`, if any.
    ///
    /// Returns true if a row was removed.
    async fn remove_doctor_detail(&self, doctor_id: &IdentityId) -> Result<bool, RepositoryError>;

    /// Appends a schedule row. Not idempotent.
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), RepositoryError>;
}

/// Storage for refresh credentials.
#[async_trait]
pub trait RefreshCredentialStore: Send + Sync {
    /// Finds a non-revoked credential of `owner` that has not expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the owner has no active credential.
    async fn find_active(
        &self,
        owner: &IdentityId,
        now: DateTime<Utc>,
    ) -> Result<RefreshCredential, RepositoryError>;

    /// Stores a credential without touching the owner's other credentials.
    async fn insert(&self, credential: &RefreshCredential) -> Result<(), RepositoryError>;

    /// Atomically revokes every non-revoked credential of the owner and stores
    /// `credential`. Returns how many credentials were revoked.
    ///
    /// Concurrent rotations for the same owner must serialize so that at most
    /// one active credential remains.
    async fn rotate(&self, credential: &RefreshCredential) -> Result<u64, RepositoryError>;
}
