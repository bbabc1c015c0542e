// NOTE: async-stripe is compiled with only runtime-tokio-hyper and checkout.
// Webhook payloads are verified and parsed in-crate, not through async-stripe's typed events.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::plan::BillingInterval;
use crate::models::webhook_event::WebhookEventKind;

#[derive(Debug, thiserror::Error)]
pub enum StripeServiceError {
    #[error("stripe api error: {0}")]
    Api(String),
    #[error("stripe api call timed out")]
    Timeout,
    #[error("webhook verification failed: {0}")]
    Webhook(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("other error: {0}")]
    Other(String),
}

impl From<stripe::StripeError> for StripeServiceError {
    fn from(err: stripe::StripeError) -> Self {
        StripeServiceError::Api(err.to_string())
    }
}

/// One recurring line item priced inline (no pre-created price objects).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    /// Minor currency units per billing interval.
    pub unit_amount: i64,
    pub interval: BillingInterval,
    pub quantity: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    pub success_url: String,
    pub cancel_url: String,
    pub customer: String,
    pub client_reference_id: Option<String>,
    pub line_items: Vec<CheckoutLineItem>,
    pub trial_period_days: Option<u32>,
    /// Read back from the completed session by the webhook.
    pub metadata: BTreeMap<String, String>,
    /// Copied onto the subscription, which outlives the session.
    pub subscription_metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A verified webhook delivery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    pub r#type: String,
    pub payload: serde_json::Value,
}

impl StripeEvent {
    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::parse(&self.r#type)
    }
}

#[derive(Deserialize)]
struct EventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
}

/// Parses the envelope of an already verified payload.
pub fn parse_event(payload: &[u8]) -> Result<StripeEvent, StripeServiceError> {
    let envelope: EventEnvelope =
        serde_json::from_slice(payload).map_err(|e| StripeServiceError::Serde(e.to_string()))?;
    let payload: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| StripeServiceError::Serde(e.to_string()))?;
    Ok(StripeEvent {
        id: envelope.id,
        r#type: envelope.event_type,
        payload,
    })
}

#[async_trait]
pub trait StripeService: Send + Sync {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, StripeServiceError>;

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError>;

    /// Verifies the signature over the raw body and returns the typed event.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeServiceError>;
}

mod live;
mod mock;
pub mod signature;

pub use live::LiveStripeService;
#[allow(unused_imports)]
pub use mock::{MockStripeService, MOCK_WEBHOOK_SECRET};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request() -> CreateCheckoutSessionRequest {
        CreateCheckoutSessionRequest {
            success_url: "https://example.test/success".into(),
            cancel_url: "https://example.test/cancel".into(),
            customer: "cus_test_123".into(),
            client_reference_id: Some("acme".into()),
            line_items: vec![CheckoutLineItem {
                name: "Premium".into(),
                unit_amount: 40_000,
                interval: BillingInterval::Year,
                quantity: 1,
            }],
            trial_period_days: Some(30),
            metadata: [("plan".to_string(), "premium".to_string())]
                .into_iter()
                .collect(),
            subscription_metadata: [("plan".to_string(), "premium".to_string())]
                .into_iter()
                .collect(),
        }
    }

    #[tokio::test]
    async fn mock_captures_checkout_request_and_returns_url() {
        let mock = MockStripeService::new();
        let req = request();

        let session = mock.create_checkout_session(req.clone()).await.unwrap();
        assert!(session.id.starts_with("cs_test_"));
        assert_eq!(
            session.url.as_deref(),
            Some("https://example.test/checkout")
        );

        let captured = mock.last_create_requests.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let first = &captured[0];
        assert_eq!(first.customer, req.customer);
        assert_eq!(first.client_reference_id, req.client_reference_id);
        assert_eq!(first.line_items, req.line_items);
        assert_eq!(first.metadata.get("plan").map(String::as_str), Some("premium"));
    }

    #[test]
    fn live_verify_webhook_invalid_signature_maps_to_webhook_error() {
        let live = LiveStripeService::new("sk_test_dummy", "whsec_test", Duration::from_secs(5));
        let payload = br#"{ "id": "evt_123", "type": "checkout.session.completed" }"#;
        let result = live.verify_webhook(payload, "t=1,v1=invalidsignature");
        assert!(matches!(result, Err(StripeServiceError::Webhook(_))));
    }

    #[test]
    fn live_verify_webhook_accepts_freshly_signed_payload() {
        let live = LiveStripeService::new("sk_test_dummy", "whsec_test", Duration::from_secs(5));
        let payload = br#"{ "id": "evt_123", "type": "invoice.payment_failed", "data": {} }"#;
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let header = signature::sign_payload(payload, "whsec_test", now);
        let event = live.verify_webhook(payload, &header).unwrap();
        assert_eq!(event.id, "evt_123");
        assert_eq!(event.kind(), WebhookEventKind::InvoicePaymentFailed);
    }

    #[test]
    fn parse_event_requires_id_and_type() {
        assert!(parse_event(br#"{"type":"x"}"#).is_err());
        assert!(parse_event(b"not json").is_err());
        let event = parse_event(br#"{"id":"evt_1","type":"x","data":{}}"#).unwrap();
        assert_eq!(event.kind(), WebhookEventKind::Other("x".into()));
    }
}
