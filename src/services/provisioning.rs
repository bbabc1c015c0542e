//! Turns a completed checkout into a tenant.
//!
//! Each webhook delivery runs the whole orchestration from scratch. Nothing
//! is remembered between attempts: the core API's uniqueness constraint on
//! the subdomain is what makes redelivery safe, and this module only has to
//! read that signal correctly.

use rand::{distr::Alphanumeric, Rng};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::checkout_intent::{AdminCredential, AdminUser, CheckoutIntent, MetadataError};
use crate::models::tenant::{
    CreateTenantRequest, CreatedTenant, ProcessorRefs, TenantAdmin, TenantSummary,
};
use crate::models::webhook_event::CompletedCheckout;
use crate::services::core_api::{is_duplicate_subdomain, TenantApi, TenantApiError};
use crate::services::notification;

const PLACEHOLDER_PASSWORD_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// `new` is false when an earlier delivery already created the tenant.
    Provisioned {
        new: bool,
        tenant_id: Option<String>,
        user_id: Option<String>,
    },
    Failed {
        retryable: bool,
        reason: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("tenant provisioning failed: {reason}")]
pub struct ProvisioningError {
    pub retryable: bool,
    pub reason: String,
}

/// Unit of work derived from a checkout's metadata plus processor identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantProvisioningRequest {
    pub intent: CheckoutIntent,
    pub processor: ProcessorRefs,
}

impl TenantProvisioningRequest {
    pub fn from_checkout(checkout: &CompletedCheckout) -> Result<Self, MetadataError> {
        let intent = CheckoutIntent::from_metadata(checkout.metadata_entries())?;
        Ok(Self {
            intent,
            processor: ProcessorRefs {
                stripe_customer_id: checkout.customer_id.clone(),
                stripe_subscription_id: checkout.subscription_id.clone(),
                stripe_checkout_session_id: Some(checkout.session_id.clone()),
            },
        })
    }

    pub fn to_create_request(&self) -> CreateTenantRequest {
        CreateTenantRequest {
            subdomain: self.intent.subdomain.clone(),
            user: tenant_admin(&self.intent.admin),
            plan_id: self.intent.plan.internal_id(),
            processor: self.processor.clone(),
        }
    }
}

fn placeholder_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PLACEHOLDER_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// OAuth administrators get a random password they never see.
pub(crate) fn tenant_admin(admin: &AdminUser) -> TenantAdmin {
    let password = match &admin.credential {
        AdminCredential::Password(password) => password.clone(),
        AdminCredential::OAuth => placeholder_password(),
    };
    TenantAdmin {
        email: admin.email.clone(),
        first_name: admin.first_name.clone(),
        last_name: admin.last_name.clone(),
        password,
    }
}

/// Whether `existing` was created by this same checkout. A tenant with no
/// recorded session (free tier, manual) is never a replay.
pub fn owned_by_checkout(existing: &TenantSummary, session_id: &str) -> bool {
    existing.stripe_checkout_session_id.as_deref() == Some(session_id)
}

/// Maps one create-tenant response onto an outcome.
pub fn classify_create_result(result: Result<CreatedTenant, TenantApiError>) -> ProvisioningOutcome {
    match result {
        Ok(created) => ProvisioningOutcome::Provisioned {
            new: true,
            tenant_id: Some(created.tenant_id),
            user_id: created.user_id,
        },
        Err(err) if is_duplicate_subdomain(&err) => ProvisioningOutcome::Provisioned {
            new: false,
            tenant_id: None,
            user_id: None,
        },
        Err(err) => ProvisioningOutcome::Failed {
            retryable: err.is_retryable(),
            reason: err.to_string(),
        },
    }
}

async fn run(tenant_api: &dyn TenantApi, checkout: &CompletedCheckout) -> ProvisioningOutcome {
    let request = match TenantProvisioningRequest::from_checkout(checkout) {
        Ok(request) => request,
        Err(err) => {
            error!(
                ?err,
                session_id = %checkout.session_id,
                "checkout completed with unusable metadata; manual provisioning required"
            );
            return ProvisioningOutcome::Failed {
                retryable: false,
                reason: err.to_string(),
            };
        }
    };
    let subdomain = request.intent.subdomain.as_str();

    match tenant_api.find_tenant_by_subdomain(subdomain).await {
        Ok(Some(existing)) => {
            if owned_by_checkout(&existing, &checkout.session_id) {
                info!(%subdomain, session_id = %checkout.session_id, tenant_id = %existing.id, "tenant already provisioned; replay acknowledged");
            } else {
                error!(
                    %subdomain,
                    session_id = %checkout.session_id,
                    owner_session_id = existing.stripe_checkout_session_id.as_deref().unwrap_or("none"),
                    tenant_id = %existing.id,
                    "subdomain already belongs to another owner; paid checkout left without a workspace, reconcile manually"
                );
            }
            return ProvisioningOutcome::Provisioned {
                new: false,
                tenant_id: Some(existing.id),
                user_id: None,
            };
        }
        Ok(None) => {}
        Err(err) => {
            warn!(?err, %subdomain, "tenant lookup failed; relying on create uniqueness");
        }
    }

    let outcome = classify_create_result(tenant_api.create_tenant(&request.to_create_request()).await);

    match &outcome {
        ProvisioningOutcome::Provisioned {
            new: true,
            tenant_id,
            user_id,
        } => {
            info!(
                %subdomain,
                plan = %request.intent.plan,
                session_id = %checkout.session_id,
                tenant_id = tenant_id.as_deref().unwrap_or_default(),
                "tenant provisioned"
            );
            if let Some(user_id) = user_id {
                notification::send_verification_email(tenant_api, user_id, subdomain).await;
            }
        }
        ProvisioningOutcome::Provisioned { new: false, .. } => {
            info!(%subdomain, session_id = %checkout.session_id, "subdomain already exists; treating delivery as replay");
        }
        ProvisioningOutcome::Failed { retryable, reason } => {
            error!(%subdomain, session_id = %checkout.session_id, retryable, %reason, "tenant provisioning failed");
        }
    }

    outcome
}

/// Provisions the tenant for a completed checkout. `Err` means the delivery
/// must be answered with a retry signal.
pub async fn provision_from_checkout(
    tenant_api: &dyn TenantApi,
    checkout: &CompletedCheckout,
) -> Result<ProvisioningOutcome, ProvisioningError> {
    match run(tenant_api, checkout).await {
        ProvisioningOutcome::Failed { retryable, reason } => {
            Err(ProvisioningError { retryable, reason })
        }
        outcome => Ok(outcome),
    }
}
