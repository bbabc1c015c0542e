use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::checkout_intent::CheckoutIntent;
use crate::models::signup::{CheckoutSessionPayload, SignupValidationError};
use crate::services::core_api::TenantApi;
use crate::services::stripe::{CheckoutLineItem, CreateCheckoutSessionRequest, StripeService};
use crate::utils::pricing;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    InvalidPlanSelection(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("subdomain '{0}' is already taken")]
    SubdomainTaken(String),
    #[error("payment provider unavailable: {0}")]
    PaymentProviderUnavailable(String),
}

impl From<SignupValidationError> for CheckoutError {
    fn from(err: SignupValidationError) -> Self {
        match err {
            SignupValidationError::Plan(msg) => CheckoutError::InvalidPlanSelection(msg),
            SignupValidationError::Field(msg) => CheckoutError::InvalidRequest(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStarted {
    pub session_id: String,
    pub url: String,
    /// Amount charged per billing interval, in minor units.
    pub amount: i64,
}

/// Creates the processor customer and a checkout session carrying the full
/// [`CheckoutIntent`] as metadata. Nothing is stored locally; the webhook
/// will get everything back from the processor.
///
/// A subdomain that already has a tenant is refused before the customer is
/// charged. A failed lookup does not block checkout; the webhook's create
/// call still enforces uniqueness.
pub async fn start_checkout(
    stripe: &dyn StripeService,
    tenant_api: &dyn TenantApi,
    config: &Config,
    payload: &CheckoutSessionPayload,
) -> Result<CheckoutStarted, CheckoutError> {
    let validated = payload.validate()?;

    let existing = tenant_api.find_tenant_by_subdomain(&validated.subdomain).await;
    match existing {
        Ok(Some(existing)) => {
            info!(subdomain = %validated.subdomain, tenant_id = %existing.id, "checkout refused for taken subdomain");
            return Err(CheckoutError::SubdomainTaken(validated.subdomain));
        }
        Ok(None) => {}
        Err(err) => {
            warn!(?err, subdomain = %validated.subdomain, "subdomain availability check failed; continuing checkout");
        }
    }

    let amount =
        pricing::price_for_interval(validated.plan, validated.apartments, validated.billing_interval);

    let intent = CheckoutIntent {
        plan: validated.plan,
        apartments: validated.apartments,
        billing_interval: validated.billing_interval,
        subdomain: validated.subdomain,
        admin: validated.admin,
    };

    let full_name = format!("{} {}", intent.admin.first_name, intent.admin.last_name);
    let customer_id = stripe
        .create_customer(&intent.admin.email, Some(full_name.trim()))
        .await
        .map_err(|err| {
            error!(?err, subdomain = %intent.subdomain, "failed to create processor customer");
            CheckoutError::PaymentProviderUnavailable(err.to_string())
        })?;

    let request = CreateCheckoutSessionRequest {
        success_url: config.checkout_success_url(),
        cancel_url: config.checkout_cancel_url(),
        customer: customer_id.clone(),
        client_reference_id: Some(intent.subdomain.clone()),
        line_items: vec![CheckoutLineItem {
            name: format!("{} plan ({} apartments)", intent.plan.display_name(), intent.apartments),
            unit_amount: amount,
            interval: intent.billing_interval,
            quantity: 1,
        }],
        trial_period_days: Some(config.trial_period_days).filter(|days| *days > 0),
        metadata: intent.to_metadata(),
        subscription_metadata: intent.to_subscription_metadata(),
    };

    let session = stripe.create_checkout_session(request).await.map_err(|err| {
        error!(?err, subdomain = %intent.subdomain, %customer_id, "failed to create checkout session");
        CheckoutError::PaymentProviderUnavailable(err.to_string())
    })?;

    let url = session.url.ok_or_else(|| {
        error!(session_id = %session.id, "checkout session returned without a redirect url");
        CheckoutError::PaymentProviderUnavailable("checkout session has no redirect url".into())
    })?;

    info!(
        session_id = %session.id,
        subdomain = %intent.subdomain,
        plan = %intent.plan,
        apartments = intent.apartments,
        interval = intent.billing_interval.as_str(),
        amount,
        "created checkout session"
    );

    Ok(CheckoutStarted {
        session_id: session.id,
        url,
        amount,
    })
}
