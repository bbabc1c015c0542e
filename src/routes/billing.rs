use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use serde_json::json;
use tracing::warn;

use crate::models::signup::CheckoutSessionPayload;
use crate::responses::JsonResponse;
use crate::services::checkout::{self, CheckoutError};
use crate::state::AppState;

// POST /checkout-sessions
pub async fn create_checkout_session(
    State(app_state): State<AppState>,
    payload: Result<Json<CheckoutSessionPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(%rejection, "malformed checkout request");
            return JsonResponse::bad_request_with_code(&rejection.body_text(), "invalid_request")
                .into_response();
        }
    };

    match checkout::start_checkout(
        app_state.stripe.as_ref(),
        app_state.tenant_api.as_ref(),
        &app_state.config,
        &payload,
    )
    .await
    {
        Ok(started) => Json(json!({
            "success": true,
            "sessionId": started.session_id,
            "url": started.url,
        }))
        .into_response(),
        Err(CheckoutError::InvalidPlanSelection(msg)) => {
            JsonResponse::bad_request_with_code(&msg, "invalid_plan_selection").into_response()
        }
        Err(CheckoutError::InvalidRequest(msg)) => {
            JsonResponse::bad_request_with_code(&msg, "invalid_request").into_response()
        }
        Err(err @ CheckoutError::SubdomainTaken(_)) => {
            JsonResponse::conflict_with_code(&err.to_string(), "subdomain_taken").into_response()
        }
        Err(CheckoutError::PaymentProviderUnavailable(_)) => {
            JsonResponse::service_unavailable_with_code(
                "Payment provider is unavailable. Please try again shortly.",
                "payment_provider_unavailable",
            )
            .into_response()
        }
    }
}
