//! OAuth-code logins and staff provisioning.
//!
//! A successful code exchange makes sure the identity has a staff profile,
//! a doctor detail when the role requires one, and a new default schedule.
//! Profiles and details are upserted so repeated logins never duplicate
//! them. Schedules are appended on every login.

use crate::error::{GatewayError, Operation};
use crate::gateway::{AuthGateway, identity_failure, repository_failure};
use crate::request::OAuthPresentation;
use crate::response::{Envelope, OAuthLogin, OAuthUserView, TOKEN_TYPE};
use chrono::{DateTime, Utc};
use medigate_accounts::token::generate_license_no;
use medigate_accounts::{DoctorDetail, Schedule, StaffProfile, StaffProfileUpsert, StaffRole};
use medigate_core::{IdentityId, Result};
use tracing::{info, instrument};

/// Display name used when the identity carries none.
const UNKNOWN_NAME: &str = "Unknown";

/// Records written by [`AuthGateway::provision_staff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedStaff {
    pub staff: StaffProfile,
    pub doctor: Option<DoctorDetail>,
    pub schedule: Schedule,
}

impl AuthGateway {
    /// Logs in with an OAuth authorization code and provisions the staff
    /// records for the identity.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` if the exchange is refused or yields no
    /// email, and `Upstream` tagged with the identity if provisioning fails.
    #[instrument(skip_all, fields(role = %oauth.role, identity_id = tracing::field::Empty))]
    pub async fn oauth_login(
        &self,
        oauth: OAuthPresentation,
    ) -> Result<Envelope<OAuthLogin>, GatewayError> {
        let sign_in = self
            .within(
                Operation::CodeExchange,
                None,
                self.identity.exchange_code(&oauth.code, &oauth.code_verifier),
            )
            .await?
            .map_err(|report| {
                identity_failure(
                    report,
                    Operation::CodeExchange,
                    None,
                    GatewayError::authentication("OAuth authentication failed"),
                )
            })?;

        let Some(identity) = sign_in.identity else {
            return Err(GatewayError::authentication("No user data or email returned").into());
        };
        let Some(email) = identity.usable_email().map(str::to_string) else {
            return Err(GatewayError::authentication("No user data or email returned").into());
        };

        tracing::Span::current().record("identity_id", identity.id.as_str());

        let name = identity
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());

        let provisioned = self
            .provision_staff(&identity.id, &name, &email, oauth.role, Utc::now())
            .await?;

        info!(
            doctor = provisioned.doctor.is_some(),
            "oauth login succeeded"
        );

        let session = sign_in.session;
        Ok(Envelope::ok(
            "OAuth login and staff registration successful",
            OAuthLogin {
                user: OAuthUserView {
                    id: identity.id.clone(),
                    email,
                    name,
                    last_sign_in_at: identity.last_sign_in_at,
                },
                staff: provisioned.staff,
                doctor: provisioned.doctor,
                schedule: provisioned.schedule,
                access_token: session.as_ref().map(|s| s.access_token.clone()),
                token_type: TOKEN_TYPE,
                expires_in: session
                    .as_ref()
                    .map_or(self.config.default_expires_in_seconds, |s| s.expires_in),
                refresh_token: session.and_then(|s| s.refresh_token),
            },
        ))
    }

    /// Ensures the staff profile, the doctor detail for doctors, and a new
    /// schedule exist for `staff_id`, in that order. Any other role loses a
    /// doctor detail left over from an earlier login.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` tagged with `staff_id` for the first failing step.
    pub async fn provision_staff(
        &self,
        staff_id: &IdentityId,
        full_name: &str,
        working_email: &str,
        role: StaffRole,
        now: DateTime<Utc>,
    ) -> Result<ProvisionedStaff, GatewayError> {
        let upsert = StaffProfileUpsert {
            staff_id: staff_id.clone(),
            full_name: full_name.to_string(),
            working_email: working_email.to_string(),
            role,
            at: now,
        };
        let staff = self
            .within(
                Operation::UpsertStaff,
                Some(staff_id),
                self.accounts.upsert_staff_profile(upsert),
            )
            .await?
            .map_err(|report| repository_failure(report, Operation::UpsertStaff, staff_id))?;

        let doctor = if role.requires_doctor_detail() {
            let license_no = generate_license_no().map_err(|e| GatewayError::Internal {
                details: format!("failed to generate licence number: {e}"),
            })?;
            let detail = self
                .within(
                    Operation::UpsertDoctor,
                    Some(staff_id),
                    self.accounts
                        .upsert_doctor_detail(DoctorDetail::general(staff_id.clone(), license_no)),
                )
                .await?
                .map_err(|report| repository_failure(report, Operation::UpsertDoctor, staff_id))?;
            Some(detail)
        } else {
            // Only doctors keep a detail row.
            let removed = self
                .within(
                    Operation::RemoveDoctor,
                    Some(staff_id),
                    self.accounts.remove_doctor_detail(staff_id),
                )
                .await?
                .map_err(|report| repository_failure(report, Operation::RemoveDoctor, staff_id))?;
            if removed {
                info!(role = role.as_str(), "removed doctor details after role change");
            }
            None
        };

        let schedule = Schedule::one_off(staff_id.clone(), now, self.config.schedule_window());
        self.within(
            Operation::InsertSchedule,
            Some(staff_id),
            self.accounts.insert_schedule(&schedule),
        )
        .await?
        .map_err(|report| repository_failure(report, Operation::InsertSchedule, staff_id))?;

        Ok(ProvisionedStaff {
            staff,
            doctor,
            schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{LoginRequest, parse_role};
    use crate::response::LoginData;
    use crate::testing::{FakeCall, TestGateway};
    use medigate_accounts::{FailurePoint, RepositoryError, RequestOrigin};
    use medigate_identity::{Identity, IdentityError};
    use serde_json::json;

    fn staff_identity() -> Identity {
        Identity::new("s-1")
            .with_email(Some("grace@example.com".to_string()))
            .with_display_name(Some("Grace Hopper".to_string()))
    }

    fn presentation(role: StaffRole) -> OAuthPresentation {
        OAuthPresentation {
            code: "code-1".to_string(),
            code_verifier: "verifier-1".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn default_role_creates_staff_and_schedule_only() {
        let t = TestGateway::new();
        t.identity.add_code("code-1", "verifier-1", staff_identity());

        let envelope = t
            .gateway
            .oauth_login(presentation(parse_role(None).unwrap()))
            .await
            .unwrap();

        assert_eq!(
            envelope.message,
            "OAuth login and staff registration successful"
        );
        let data = envelope.data;
        assert_eq!(data.user.name, "Grace Hopper");
        assert_eq!(data.staff.role, StaffRole::Staff);
        assert!(data.doctor.is_none());
        assert_eq!(
            data.schedule.end_time - data.schedule.start_time,
            chrono::Duration::hours(1)
        );
        assert!(data.access_token.is_some());

        let id = IdentityId::new("s-1");
        assert!(t.repository.staff_profile(&id).is_some());
        assert_eq!(t.repository.doctor_count(), 0);
        assert_eq!(t.repository.schedules_for(&id).len(), 1);
    }

    #[tokio::test]
    async fn doctor_logins_keep_one_detail_and_append_schedules() {
        let t = TestGateway::new();
        t.identity.add_code("code-1", "verifier-1", staff_identity());
        let id = IdentityId::new("s-1");

        let first = t
            .gateway
            .oauth_login(presentation(StaffRole::Doctor))
            .await
            .unwrap();
        let second = t
            .gateway
            .oauth_login(presentation(StaffRole::Doctor))
            .await
            .unwrap();

        let first_license = first.data.doctor.expect("doctor").license_no;
        let second_license = second.data.doctor.expect("doctor").license_no;
        assert_eq!(first_license, second_license);
        assert!(first_license.starts_with("LIC-"));

        assert_eq!(t.repository.staff_count(), 1);
        assert_eq!(t.repository.doctor_count(), 1);
        assert_eq!(t.repository.schedules_for(&id).len(), 2);
        assert_ne!(
            first.data.schedule.schedule_id,
            second.data.schedule.schedule_id
        );
    }

    #[tokio::test]
    async fn demoted_doctor_loses_detail() {
        let t = TestGateway::new();
        t.identity.add_code("code-1", "verifier-1", staff_identity());
        let id = IdentityId::new("s-1");

        t.gateway
            .oauth_login(presentation(StaffRole::Doctor))
            .await
            .unwrap();
        assert!(t.repository.doctor_detail(&id).is_some());

        let envelope = t
            .gateway
            .oauth_login(presentation(StaffRole::Staff))
            .await
            .unwrap();

        assert_eq!(envelope.data.staff.role, StaffRole::Staff);
        assert!(envelope.data.doctor.is_none());
        assert_eq!(t.repository.doctor_detail(&id), None);
        assert_eq!(t.repository.doctor_count(), 0);
        assert_eq!(t.repository.schedules_for(&id).len(), 2);
    }

    #[tokio::test]
    async fn doctor_removal_failure_is_upstream() {
        let t = TestGateway::new();
        t.repository.fail(
            FailurePoint::RemoveDoctor,
            RepositoryError::Unavailable {
                details: "down".to_string(),
            },
        );

        let err = t
            .gateway
            .provision_staff(
                &IdentityId::new("s-1"),
                "Grace",
                "grace@example.com",
                StaffRole::Admin,
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &GatewayError::Upstream {
                operation: Operation::RemoveDoctor,
                identity: Some(IdentityId::new("s-1")),
                timed_out: false,
            }
        );
        assert_eq!(
            err.current_context().public_message(),
            "Failed to create/update doctor details"
        );
        assert_eq!(
            t.repository.calls(),
            vec![FailurePoint::UpsertStaff, FailurePoint::RemoveDoctor]
        );
        assert!(t.repository.schedules_for(&IdentityId::new("s-1")).is_empty());
    }

    #[tokio::test]
    async fn missing_display_name_becomes_unknown() {
        let t = TestGateway::new();
        t.identity.add_code(
            "code-1",
            "verifier-1",
            Identity::new("s-2").with_email(Some("anon@example.com".to_string())),
        );

        let envelope = t
            .gateway
            .oauth_login(presentation(StaffRole::Admin))
            .await
            .unwrap();
        assert_eq!(envelope.data.user.name, "Unknown");
        assert_eq!(envelope.data.staff.full_name, "Unknown");
        assert_eq!(envelope.data.staff.role, StaffRole::Admin);
    }

    #[tokio::test]
    async fn unknown_role_makes_no_external_calls() {
        let t = TestGateway::new();
        let request: LoginRequest = serde_json::from_value(json!({
            "code": "code-1",
            "codeVerifier": "verifier-1",
            "role": "janitor",
        }))
        .expect("request");

        let err = t
            .gateway
            .login(request, RequestOrigin::default())
            .await
            .unwrap_err();

        assert_eq!(err.current_context().status(), 400);
        assert!(t.identity.calls().is_empty());
        assert!(t.repository.calls().is_empty());
    }

    #[tokio::test]
    async fn login_routes_code_and_verifier_to_oauth() {
        let t = TestGateway::new();
        t.identity.add_code("code-1", "verifier-1", staff_identity());
        let request: LoginRequest = serde_json::from_value(json!({
            "code": "code-1",
            "codeVerifier": "verifier-1",
            "phone": "+15550100",
            "password": "pw",
        }))
        .expect("request");

        let envelope = t
            .gateway
            .login(request, RequestOrigin::default())
            .await
            .unwrap();
        assert!(matches!(envelope.data, LoginData::OAuth(_)));
        assert_eq!(t.identity.calls(), vec![FakeCall::ExchangeCode]);
    }

    #[tokio::test]
    async fn refused_exchange_is_authentication_failure() {
        let t = TestGateway::new();

        let err = t
            .gateway
            .oauth_login(presentation(StaffRole::Staff))
            .await
            .unwrap_err();
        assert_eq!(err.current_context().status(), 401);
        assert_eq!(
            err.current_context().public_message(),
            "OAuth authentication failed"
        );
        assert!(t.repository.calls().is_empty());
    }

    #[tokio::test]
    async fn identity_without_email_is_refused() {
        let t = TestGateway::new();
        t.identity
            .add_code("code-1", "verifier-1", Identity::new("s-3"));

        let err = t
            .gateway
            .oauth_login(presentation(StaffRole::Staff))
            .await
            .unwrap_err();
        assert_eq!(
            err.current_context().public_message(),
            "No user data or email returned"
        );
        assert_eq!(t.repository.staff_count(), 0);
    }

    #[tokio::test]
    async fn exchange_outage_is_upstream() {
        let t = TestGateway::new();
        t.identity.fail(
            FakeCall::ExchangeCode,
            IdentityError::Unavailable {
                operation: "code exchange",
                details: "502".to_string(),
            },
        );

        let err = t
            .gateway
            .oauth_login(presentation(StaffRole::Staff))
            .await
            .unwrap_err();
        assert_eq!(err.current_context().status(), 500);
    }

    #[tokio::test]
    async fn provisioning_failures_are_tagged_with_identity() {
        let t = TestGateway::new();
        t.identity.add_code("code-1", "verifier-1", staff_identity());
        t.repository.fail(
            FailurePoint::InsertSchedule,
            RepositoryError::Query {
                operation: "insert schedule",
                details: "constraint".to_string(),
            },
        );

        let err = t
            .gateway
            .oauth_login(presentation(StaffRole::Doctor))
            .await
            .unwrap_err();
        assert_eq!(
            err.current_context(),
            &GatewayError::Upstream {
                operation: Operation::InsertSchedule,
                identity: Some(IdentityId::new("s-1")),
                timed_out: false,
            }
        );
        assert_eq!(
            err.current_context().public_message(),
            "Failed to create schedule"
        );
    }

    #[tokio::test]
    async fn staff_upsert_failure_stops_provisioning() {
        let t = TestGateway::new();
        t.repository.fail(
            FailurePoint::UpsertStaff,
            RepositoryError::Unavailable {
                details: "down".to_string(),
            },
        );
        let id = IdentityId::new("s-9");

        let err = t
            .gateway
            .provision_staff(&id, "Grace", "grace@example.com", StaffRole::Doctor, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err.current_context().public_message(),
            "Failed to create/update staff member"
        );
        assert_eq!(t.repository.calls(), vec![FailurePoint::UpsertStaff]);
    }
}
