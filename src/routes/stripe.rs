use axum::Json;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use axum::response::Response;
use serde_json::json;
use tracing::{error, info};

use crate::models::webhook_event::{CompletedCheckout, WebhookEventKind};
use crate::responses::JsonResponse;
use crate::services::provisioning::{self, ProvisioningError};
use crate::services::stripe::signature::SIGNATURE_HEADER;
use crate::services::stripe::StripeEvent;
use crate::state::AppState;

// POST /webhooks/payments
pub async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let sig = match headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        Some(s) => s,
        None => {
            error!("payment webhook without signature header rejected");
            return JsonResponse::bad_request("Missing Stripe-Signature").into_response();
        }
    };

    // Verification runs over the raw bytes exactly as received.
    let evt = match app_state.stripe.verify_webhook(&body, sig) {
        Ok(e) => e,
        Err(err) => {
            error!(?err, "payment webhook verification failed; check the signing secret");
            return JsonResponse::bad_request("Invalid webhook signature").into_response();
        }
    };

    match dispatch(&app_state, &evt).await {
        Ok(()) => Json(json!({ "received": true })).into_response(),
        Err(err) => {
            error!(
                event_id = %evt.id,
                evt_type = %evt.r#type,
                retryable = err.retryable,
                reason = %err.reason,
                "payment webhook handling failed; asking processor to redeliver"
            );
            JsonResponse::server_error("Webhook handling failed").into_response()
        }
    }
}

/// Routes a verified event to its handler. Types without a handler are
/// acknowledged so the processor stops redelivering them.
pub async fn dispatch(app_state: &AppState, evt: &StripeEvent) -> Result<(), ProvisioningError> {
    let event_id = evt.id.as_str();
    match evt.kind() {
        WebhookEventKind::CheckoutSessionCompleted => {
            let Some(checkout) = CompletedCheckout::from_event_payload(&evt.payload) else {
                return Err(ProvisioningError {
                    retryable: false,
                    reason: "checkout.session.completed without a session object".into(),
                });
            };
            provisioning::provision_from_checkout(app_state.tenant_api.as_ref(), &checkout)
                .await
                .map(|_| ())
        }
        WebhookEventKind::SubscriptionCreated
        | WebhookEventKind::SubscriptionUpdated
        | WebhookEventKind::SubscriptionDeleted
        | WebhookEventKind::InvoicePaymentSucceeded
        | WebhookEventKind::InvoicePaymentFailed => {
            let object_id = evt
                .payload
                .pointer("/data/object/id")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            info!(event_id, evt_type = %evt.r#type, object_id, "payment event received");
            Ok(())
        }
        WebhookEventKind::Other(evt_type) => {
            info!(event_id, %evt_type, "ignoring unsubscribed payment event type");
            Ok(())
        }
    }
}
