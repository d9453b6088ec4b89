//! In-memory repository for tests.
//!
//! Implements both [`AccountRepository`] and [`RefreshCredentialStore`] over
//! one mutex, which also makes `rotate` trivially atomic. Failures can be
//! injected per operation to exercise the gateway's error paths.

use crate::account::AccountProfile;
use crate::error::RepositoryError;
use crate::refresh::RefreshCredential;
use crate::repository::{AccountRepository, RefreshCredentialStore};
use crate::staff::{DoctorDetail, Schedule, StaffProfile, StaffProfileUpsert};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medigate_core::{IdentityId, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Repository operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    FindAccount,
    InsertAccount,
    TouchAccount,
    UpsertStaff,
    UpsertDoctor,
    RemoveDoctor,
    InsertSchedule,
    FindActiveRefresh,
    InsertRefresh,
    RotateRefresh,
}

#[derive(Default)]
struct State {
    accounts: HashMap<IdentityId, AccountProfile>,
    staff: HashMap<IdentityId, StaffProfile>,
    doctors: HashMap<IdentityId, DoctorDetail>,
    schedules: Vec<Schedule>,
    refresh: Vec<RefreshCredential>,
    failures: HashMap<FailurePoint, RepositoryError>,
    calls: Vec<FailurePoint>,
}

/// Mutex-backed repository holding every table in memory.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    state: Mutex<State>,
}

impl InMemoryAccountRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a call and returns the injected failure for it, if any.
    fn enter(state: &mut State, point: FailurePoint) -> Result<(), RepositoryError> {
        state.calls.push(point);
        match state.failures.get(&point) {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    /// Makes every subsequent call to `point` fail with `error`.
    pub fn fail(&self, point: FailurePoint, error: RepositoryError) {
        self.lock().failures.insert(point, error);
    }

    /// Stores an account profile directly, bypassing failure injection.
    pub fn seed_account(&self, account: AccountProfile) {
        self.lock()
            .accounts
            .insert(account.customer_id.clone(), account);
    }

    /// Stores a refresh credential directly, bypassing failure injection.
    pub fn seed_refresh_credential(&self, credential: RefreshCredential) {
        self.lock().refresh.push(credential);
    }

    /// Returns every repository call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<FailurePoint> {
        self.lock().calls.clone()
    }

    /// Returns the stored account profile.
    #[must_use]
    pub fn account(&self, id: &IdentityId) -> Option<AccountProfile> {
        self.lock().accounts.get(id).cloned()
    }

    /// Returns the stored staff profile.
    #[must_use]
    pub fn staff_profile(&self, id: &IdentityId) -> Option<StaffProfile> {
        self.lock().staff.get(id).cloned()
    }

    /// Returns the number of stored staff profiles.
    #[must_use]
    pub fn staff_count(&self) -> usize {
        self.lock().staff.len()
    }

    /// Returns the stored doctor detail.
    #[must_use]
    pub fn doctor_detail(&self, id: &IdentityId) -> Option<DoctorDetail> {
        self.lock().doctors.get(id).cloned()
    }

    /// Returns the number of stored doctor details.
    #[must_use]
    pub fn doctor_count(&self) -> usize {
        self.lock().doctors.len()
    }

    /// Returns every schedule of a staff member.
    #[must_use]
    pub fn schedules_for(&self, id: &IdentityId) -> Vec<Schedule> {
        self.lock()
            .schedules
            .iter()
            .filter(|s| &s.staff_id == id)
            .cloned()
            .collect()
    }

    /// Returns every refresh credential of an owner, revoked or not.
    #[must_use]
    pub fn refresh_credentials_for(&self, id: &IdentityId) -> Vec<RefreshCredential> {
        self.lock()
            .refresh
            .iter()
            .filter(|c| &c.customer_id == id)
            .cloned()
            .collect()
    }

    /// Returns the number of credentials of an owner active at `now`.
    #[must_use]
    pub fn active_refresh_count(&self, id: &IdentityId, now: DateTime<Utc>) -> usize {
        self.lock()
            .refresh
            .iter()
            .filter(|c| &c.customer_id == id && c.is_active(now))
            .count()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_account(&self, id: &IdentityId) -> Result<AccountProfile, RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::FindAccount)?;
        state.accounts.get(id).cloned().ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "customer",
                key: id.to_string(),
            }
            .into()
        })
    }

    async fn insert_account(&self, account: &AccountProfile) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::InsertAccount)?;
        if state.accounts.contains_key(&account.customer_id) {
            return Err(RepositoryError::Conflict {
                entity: "customer",
                key: account.customer_id.to_string(),
            }
            .into());
        }
        state
            .accounts
            .insert(account.customer_id.clone(), account.clone());
        Ok(())
    }

    async fn touch_account(
        &self,
        id: &IdentityId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::TouchAccount)?;
        if let Some(account) = state.accounts.get_mut(id) {
            account.update_at = at;
        }
        Ok(())
    }

    async fn upsert_staff_profile(
        &self,
        staff: StaffProfileUpsert,
    ) -> Result<StaffProfile, RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::UpsertStaff)?;
        let key = staff.staff_id.clone();
        let stored = match state.staff.get_mut(&key) {
            Some(existing) => {
                staff.apply_to(existing);
                existing.clone()
            }
            None => {
                let profile = staff.into_new_profile();
                state.staff.insert(key, profile.clone());
                profile
            }
        };
        Ok(stored)
    }

    async fn upsert_doctor_detail(
        &self,
        detail: DoctorDetail,
    ) -> Result<DoctorDetail, RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::UpsertDoctor)?;
        let stored = state
            .doctors
            .entry(detail.doctor_id.clone())
            .or_insert(detail);
        Ok(stored.clone())
    }

    async fn remove_doctor_detail(&self, doctor_id: &IdentityId) -> Result<bool, RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::RemoveDoctor)?;
        Ok(state.doctors.remove(doctor_id).is_some())
    }

    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::InsertSchedule)?;
        state.schedules.push(schedule.clone());
        Ok(())
    }
}

#[async_trait]
impl RefreshCredentialStore for InMemoryAccountRepository {
    async fn find_active(
        &self,
        owner: &IdentityId,
        now: DateTime<Utc>,
    ) -> Result<RefreshCredential, RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::FindActiveRefresh)?;
        state
            .refresh
            .iter()
            .filter(|c| &c.customer_id == owner && c.is_active(now))
            .max_by_key(|c| c.created_at)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::NotFound {
                    entity: "refresh credential",
                    key: owner.to_string(),
                }
                .into()
            })
    }

    async fn insert(&self, credential: &RefreshCredential) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::InsertRefresh)?;
        state.refresh.push(credential.clone());
        Ok(())
    }

    async fn rotate(&self, credential: &RefreshCredential) -> Result<u64, RepositoryError> {
        let mut state = self.lock();
        Self::enter(&mut state, FailurePoint::RotateRefresh)?;
        let mut revoked = 0;
        for existing in state
            .refresh
            .iter_mut()
            .filter(|c| c.customer_id == credential.customer_id && !c.is_revoked)
        {
            existing.is_revoked = true;
            revoked += 1;
        }
        state.refresh.push(credential.clone());
        Ok(revoked)
    }
}
