use std::collections::BTreeMap;

use serde_json::Value;

/// Event types this service subscribes to. Anything else is acknowledged and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    CheckoutSessionCompleted,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    Other(String),
}

impl WebhookEventKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            other => Self::Other(other.to_string()),
        }
    }
}

fn jget<'a>(val: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = val;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

// Processor references arrive either as a bare id or as an expanded object.
fn extract_ref(val: Option<&Value>) -> Option<String> {
    match val? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj.get("id").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

/// The parts of a `checkout.session.completed` object the orchestrator reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CompletedCheckout {
    pub fn from_event_payload(payload: &Value) -> Option<Self> {
        let object = jget(payload, &["data", "object"])?;
        let session_id = object.get("id")?.as_str()?.to_string();
        let metadata = object
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Some(CompletedCheckout {
            session_id,
            customer_id: extract_ref(object.get("customer")),
            subscription_id: extract_ref(object.get("subscription")),
            metadata,
        })
    }

    pub fn metadata_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
