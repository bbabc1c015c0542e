use super::{
    parse_event, signature, CheckoutLineItem, CheckoutSession, CreateCheckoutSessionRequest,
    StripeEvent, StripeService, StripeServiceError,
};
use crate::models::plan::BillingInterval;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

pub struct LiveStripeService {
    client: stripe::Client,
    webhook_secret: String,
    timeout: Duration,
    tolerance_seconds: i64,
}

impl LiveStripeService {
    pub fn new(
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = stripe::Client::new(secret_key);
        Self {
            client,
            webhook_secret: webhook_secret.into(),
            timeout,
            tolerance_seconds: signature::DEFAULT_TOLERANCE_SECONDS,
        }
    }

    pub fn from_settings(settings: &crate::config::StripeSettings, timeout: Duration) -> Self {
        let mut service = Self::new(
            settings.secret_key.clone(),
            settings.webhook_secret.clone(),
            timeout,
        );
        service.tolerance_seconds = settings.webhook_tolerance_seconds;
        service
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StripeServiceError>
    where
        F: Future<Output = Result<T, stripe::StripeError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StripeServiceError::from),
            Err(_) => Err(StripeServiceError::Timeout),
        }
    }
}

fn map_interval(
    interval: BillingInterval,
) -> stripe::CreateCheckoutSessionLineItemsPriceDataRecurringInterval {
    match interval {
        BillingInterval::Month => {
            stripe::CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Month
        }
        BillingInterval::Year => stripe::CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Year,
    }
}

fn map_line_items(items: &[CheckoutLineItem]) -> Vec<stripe::CreateCheckoutSessionLineItems> {
    items
        .iter()
        .map(|li| stripe::CreateCheckoutSessionLineItems {
            price_data: Some(stripe::CreateCheckoutSessionLineItemsPriceData {
                currency: stripe::Currency::EUR,
                product_data: Some(stripe::CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: li.name.clone(),
                    ..Default::default()
                }),
                recurring: Some(stripe::CreateCheckoutSessionLineItemsPriceDataRecurring {
                    interval: map_interval(li.interval),
                    interval_count: None,
                }),
                unit_amount: Some(li.unit_amount),
                ..Default::default()
            }),
            quantity: Some(li.quantity),
            ..Default::default()
        })
        .collect()
}

#[async_trait]
impl StripeService for LiveStripeService {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, StripeServiceError> {
        let mut params = stripe::CreateCustomer::new();
        params.email = Some(email);
        if let Some(name) = name {
            params.name = Some(name);
        }
        let customer = self
            .bounded(stripe::Customer::create(&self.client, params))
            .await?;
        Ok(customer.id.to_string())
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError> {
        let customer = req
            .customer
            .parse::<stripe::CustomerId>()
            .map_err(|e| StripeServiceError::Other(e.to_string()))?;
        let metadata: HashMap<String, String> = req.metadata.clone().into_iter().collect();

        let mut params = stripe::CreateCheckoutSession::new();
        params.mode = Some(stripe::CheckoutSessionMode::Subscription);
        params.success_url = Some(&req.success_url);
        params.cancel_url = Some(&req.cancel_url);
        params.customer = Some(customer);
        if let Some(ref id) = req.client_reference_id {
            params.client_reference_id = Some(id);
        }
        params.metadata = Some(metadata);
        params.line_items = Some(map_line_items(&req.line_items));
        params.payment_method_collection =
            Some(stripe::CheckoutSessionPaymentMethodCollection::IfRequired);
        params.subscription_data = Some(stripe::CreateCheckoutSessionSubscriptionData {
            trial_period_days: req.trial_period_days,
            metadata: Some(req.subscription_metadata.clone().into_iter().collect()),
            ..Default::default()
        });

        let session = self
            .bounded(stripe::CheckoutSession::create(&self.client, params))
            .await?;
        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url.clone(),
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        signature::verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            now,
            self.tolerance_seconds,
        )?;
        parse_event(payload)
    }
}
