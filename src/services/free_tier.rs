use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::plan::Plan;
use crate::models::signup::{FreeSignupPayload, SignupValidationError};
use crate::models::tenant::{CreateTenantRequest, ProcessorRefs};
use crate::services::core_api::{is_duplicate_subdomain, TenantApi};
use crate::services::notification;
use crate::services::provisioning::tenant_admin;

#[derive(Debug, Error)]
pub enum FreeSignupError {
    #[error("{0}")]
    InvalidPlanSelection(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("subdomain '{0}' is already taken")]
    SubdomainTaken(String),
    #[error("tenant service unavailable: {0}")]
    Unavailable(String),
}

impl From<SignupValidationError> for FreeSignupError {
    fn from(err: SignupValidationError) -> Self {
        match err {
            SignupValidationError::Plan(msg) => FreeSignupError::InvalidPlanSelection(msg),
            SignupValidationError::Field(msg) => FreeSignupError::InvalidRequest(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeTenant {
    pub tenant_id: String,
    pub subdomain: String,
}

/// Creates a free-plan tenant synchronously, with no payment processor
/// involved. Unlike the webhook path, a taken subdomain is reported to the
/// caller: there is no earlier attempt this request could be a replay of.
pub async fn provision_free_tenant(
    tenant_api: &dyn TenantApi,
    payload: &FreeSignupPayload,
) -> Result<FreeTenant, FreeSignupError> {
    let (subdomain, admin) = payload.validate()?;

    let request = CreateTenantRequest {
        subdomain: subdomain.clone(),
        user: tenant_admin(&admin),
        plan_id: Plan::Free.internal_id(),
        processor: ProcessorRefs::default(),
    };

    let created = match tenant_api.create_tenant(&request).await {
        Ok(created) => created,
        Err(err) if is_duplicate_subdomain(&err) => {
            warn!(%subdomain, "free signup for a subdomain that is already taken");
            return Err(FreeSignupError::SubdomainTaken(subdomain));
        }
        Err(err) if err.is_retryable() => {
            error!(?err, %subdomain, "core API unavailable during free signup");
            return Err(FreeSignupError::Unavailable(err.to_string()));
        }
        Err(err) => {
            warn!(?err, %subdomain, "core API rejected free signup");
            return Err(FreeSignupError::InvalidRequest(err.to_string()));
        }
    };

    info!(%subdomain, tenant_id = %created.tenant_id, "free tenant provisioned");

    if let Some(user_id) = created.user_id.as_deref() {
        notification::send_verification_email(tenant_api, user_id, &subdomain).await;
    }

    Ok(FreeTenant {
        tenant_id: created.tenant_id,
        subdomain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::core_api::MockTenantApi;

    fn payload(apartments: u32) -> FreeSignupPayload {
        FreeSignupPayload {
            apartments,
            subdomain: "Tiny-Block".into(),
            email: "owner@tiny.test".into(),
            first_name: "Ivo".into(),
            last_name: "Kos".into(),
            password: Some("secret".into()),
            oauth: false,
        }
    }

    #[tokio::test]
    async fn creates_free_tenant_without_processor_refs() {
        let api = MockTenantApi::new();

        let tenant = provision_free_tenant(&api, &payload(7)).await.unwrap();

        assert_eq!(tenant.subdomain, "tiny-block");
        assert_eq!(tenant.tenant_id, "tenant-tiny-block");
        let tenants = api.tenants.lock().unwrap();
        let stored = &tenants["tiny-block"];
        assert_eq!(stored.plan_id, 1);
        assert_eq!(stored.processor, ProcessorRefs::default());
        drop(tenants);
        assert_eq!(api.sent_verification_emails(), vec!["user-tiny-block".to_string()]);
    }

    #[tokio::test]
    async fn eight_apartments_rejected_before_core_call() {
        let api = MockTenantApi::new();

        let err = provision_free_tenant(&api, &payload(8)).await.unwrap_err();

        assert!(matches!(err, FreeSignupError::InvalidPlanSelection(_)));
        assert_eq!(api.create_call_count(), 0);
    }

    #[tokio::test]
    async fn taken_subdomain_is_reported() {
        let api = MockTenantApi::new().with_tenant("tiny-block", None);

        let err = provision_free_tenant(&api, &payload(3)).await.unwrap_err();

        assert!(matches!(err, FreeSignupError::SubdomainTaken(ref s) if s == "tiny-block"));
        assert!(api.sent_verification_emails().is_empty());
    }

    #[tokio::test]
    async fn core_outage_is_unavailable() {
        let api = MockTenantApi {
            fail_create_status: Some(502),
            ..Default::default()
        };

        let err = provision_free_tenant(&api, &payload(3)).await.unwrap_err();

        assert!(matches!(err, FreeSignupError::Unavailable(_)));
    }

    #[tokio::test]
    async fn email_failure_still_succeeds() {
        let api = MockTenantApi {
            fail_verification: true,
            ..Default::default()
        };

        let tenant = provision_free_tenant(&api, &payload(2)).await.unwrap();

        assert_eq!(tenant.subdomain, "tiny-block");
        assert_eq!(api.tenant_count(), 1);
    }
}
