//! Staff profiles, doctor details and schedules.
//!
//! These records are only written by the OAuth-code login path. Staff
//! profiles and doctor details are keyed by the identity ID and upserted;
//! schedules are append-only.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use medigate_core::{IdentityId, ScheduleId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a staff member signs in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    #[default]
    Staff,
    Doctor,
    Admin,
}

impl StaffRole {
    /// Every accepted role, in display order.
    pub const ALL: [StaffRole; 3] = [Self::Staff, Self::Doctor, Self::Admin];

    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }

    /// Returns true if the role requires a doctor detail row.
    #[must_use]
    pub fn requires_doctor_detail(&self) -> bool {
        matches!(self, Self::Doctor)
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a role outside [`StaffRole::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown staff role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for StaffRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// A staff member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub staff_id: IdentityId,
    pub full_name: String,
    pub working_email: String,
    pub role: StaffRole,
    pub years_experience: i32,
    pub hired_at: NaiveDate,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written by a staff profile upsert.
///
/// On insert the repository applies the defaults (no experience, hired on
/// the date of `at`, available). On update only the name, email, role and
/// `updated_at` change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffProfileUpsert {
    pub staff_id: IdentityId,
    pub full_name: String,
    pub working_email: String,
    pub role: StaffRole,
    pub at: DateTime<Utc>,
}

impl StaffProfileUpsert {
    /// Builds the row that an insert would create.
    #[must_use]
    pub fn into_new_profile(self) -> StaffProfile {
        StaffProfile {
            staff_id: self.staff_id,
            full_name: self.full_name,
            working_email: self.working_email,
            role: self.role,
            years_experience: 0,
            hired_at: self.at.date_naive(),
            is_available: true,
            created_at: self.at,
            updated_at: self.at,
        }
    }

    /// Applies this upsert to an existing row.
    ///
    /// Every column except `created_at` is rewritten, so tenure and
    /// availability start over on each login.
    pub fn apply_to(self, existing: &mut StaffProfile) {
        existing.full_name = self.full_name;
        existing.working_email = self.working_email;
        existing.role = self.role;
        existing.years_experience = 0;
        existing.hired_at = self.at.date_naive();
        existing.is_available = true;
        existing.updated_at = self.at;
    }
}

/// Doctor-specific details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorDetail {
    pub doctor_id: IdentityId,
    pub department: String,
    pub speciality: String,
    pub license_no: String,
}

impl DoctorDetail {
    /// Creates a detail row in the general department.
    #[must_use]
    pub fn general(doctor_id: IdentityId, license_no: String) -> Self {
        Self {
            doctor_id,
            department: "general".to_string(),
            speciality: "general".to_string(),
            license_no,
        }
    }
}

/// A staff availability window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: ScheduleId,
    pub staff_id: IdentityId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_recurring: bool,
}

impl Schedule {
    /// Creates a one-off schedule starting at `start` and lasting `window`.
    #[must_use]
    pub fn one_off(staff_id: IdentityId, start: DateTime<Utc>, window: Duration) -> Self {
        Self {
            schedule_id: ScheduleId::new(),
            staff_id,
            start_time: start,
            end_time: start + window,
            is_recurring: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values() {
        assert_eq!("staff".parse::<StaffRole>(), Ok(StaffRole::Staff));
        assert_eq!("doctor".parse::<StaffRole>(), Ok(StaffRole::Doctor));
        assert_eq!("admin".parse::<StaffRole>(), Ok(StaffRole::Admin));
    }

    #[test]
    fn role_rejects_unknown_and_differently_cased_values() {
        assert_eq!(
            "nurse".parse::<StaffRole>(),
            Err(UnknownRole("nurse".to_string()))
        );
        assert!("Doctor".parse::<StaffRole>().is_err());
    }

    #[test]
    fn default_role_is_staff() {
        assert_eq!(StaffRole::default(), StaffRole::Staff);
        assert!(StaffRole::Doctor.requires_doctor_detail());
        assert!(!StaffRole::Admin.requires_doctor_detail());
    }

    #[test]
    fn upsert_insert_uses_defaults() {
        let at = Utc::now();
        let profile = StaffProfileUpsert {
            staff_id: IdentityId::new("s-1"),
            full_name: "Grace".to_string(),
            working_email: "grace@example.com".to_string(),
            role: StaffRole::Admin,
            at,
        }
        .into_new_profile();

        assert_eq!(profile.years_experience, 0);
        assert!(profile.is_available);
        assert_eq!(profile.hired_at, at.date_naive());
    }

    #[test]
    fn upsert_update_resets_defaults() {
        let first = Utc::now() - Duration::days(30);
        let mut existing = StaffProfileUpsert {
            staff_id: IdentityId::new("s-1"),
            full_name: "Grace".to_string(),
            working_email: "grace@example.com".to_string(),
            role: StaffRole::Staff,
            at: first,
        }
        .into_new_profile();
        existing.years_experience = 4;
        existing.is_available = false;

        let now = Utc::now();
        StaffProfileUpsert {
            staff_id: IdentityId::new("s-1"),
            full_name: "Grace Hopper".to_string(),
            working_email: "grace@example.com".to_string(),
            role: StaffRole::Doctor,
            at: now,
        }
        .apply_to(&mut existing);

        assert_eq!(existing.full_name, "Grace Hopper");
        assert_eq!(existing.role, StaffRole::Doctor);
        assert_eq!(existing.years_experience, 0);
        assert_eq!(existing.hired_at, now.date_naive());
        assert!(existing.is_available);
        assert_eq!(existing.created_at, first);
        assert_eq!(existing.updated_at, now);
    }

    #[test]
    fn one_off_schedule_spans_window() {
        let start = Utc::now();
        let schedule = Schedule::one_off(IdentityId::new("s-1"), start, Duration::hours(1));
        assert_eq!(schedule.end_time - schedule.start_time, Duration::hours(1));
        assert!(!schedule.is_recurring);
    }
}
