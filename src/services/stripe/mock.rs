use super::{
    parse_event, signature, CheckoutSession, CreateCheckoutSessionRequest, StripeEvent,
    StripeService, StripeServiceError,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub const MOCK_WEBHOOK_SECRET: &str = "whsec_mock";

/// In-memory processor double. Webhook verification runs the real signature
/// check against [`MOCK_WEBHOOK_SECRET`] so tests exercise the same path as production.
#[derive(Clone, Default)]
pub struct MockStripeService {
    pub created_customers: Arc<Mutex<Vec<(String, Option<String>)>>>,
    pub created_sessions: Arc<Mutex<Vec<CheckoutSession>>>,
    pub last_create_requests: Arc<Mutex<Vec<CreateCheckoutSessionRequest>>>,
    pub verified_events: Arc<Mutex<Vec<StripeEvent>>>,
    pub fail_api: bool,
}

impl MockStripeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_api: true,
            ..Self::default()
        }
    }

    /// Signs `payload` the way the processor would for this double.
    pub fn sign(payload: &[u8]) -> String {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        signature::sign_payload(payload, MOCK_WEBHOOK_SECRET, now)
    }

    pub fn api_calls(&self) -> usize {
        self.created_customers.lock().unwrap().len() + self.last_create_requests.lock().unwrap().len()
    }
}

fn make_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[async_trait]
impl StripeService for MockStripeService {
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, StripeServiceError> {
        if self.fail_api {
            return Err(StripeServiceError::Api("mock processor unavailable".into()));
        }
        self.created_customers
            .lock()
            .unwrap()
            .push((email.to_string(), name.map(str::to_string)));
        Ok(make_id("cus_test"))
    }

    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError> {
        if self.fail_api {
            return Err(StripeServiceError::Api("mock processor unavailable".into()));
        }
        self.last_create_requests.lock().unwrap().push(req);

        let session = CheckoutSession {
            id: make_id("cs_test"),
            url: Some("https://example.test/checkout".into()),
        };
        self.created_sessions.lock().unwrap().push(session.clone());
        Ok(session)
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
            MOCK_WEBHOOK_SECRET,
            now,
            signature::DEFAULT_TOLERANCE_SECONDS,
        )?;
        let evt = parse_event(payload)?;
        self.verified_events.lock().unwrap().push(evt.clone());
        Ok(evt)
    }
}
