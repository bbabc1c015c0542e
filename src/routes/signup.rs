use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use serde_json::json;
use tracing::warn;

use crate::models::signup::FreeSignupPayload;
use crate::responses::JsonResponse;
use crate::services::free_tier::{self, FreeSignupError};
use crate::state::AppState;

// POST /signup/free
pub async fn free_signup(
    State(app_state): State<AppState>,
    payload: Result<Json<FreeSignupPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(%rejection, "malformed free signup request");
            return JsonResponse::bad_request_with_code(&rejection.body_text(), "invalid_request")
                .into_response();
        }
    };

    match free_tier::provision_free_tenant(app_state.tenant_api.as_ref(), &payload).await {
        Ok(tenant) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "tenantId": tenant.tenant_id,
                "subdomain": tenant.subdomain,
            })),
        )
            .into_response(),
        Err(FreeSignupError::InvalidPlanSelection(msg)) => {
            JsonResponse::bad_request_with_code(&msg, "invalid_plan_selection").into_response()
        }
        Err(FreeSignupError::InvalidRequest(msg)) => {
            JsonResponse::bad_request_with_code(&msg, "invalid_request").into_response()
        }
        Err(err @ FreeSignupError::SubdomainTaken(_)) => {
            JsonResponse::conflict_with_code(&err.to_string(), "subdomain_taken").into_response()
        }
        Err(FreeSignupError::Unavailable(_)) => JsonResponse::service_unavailable_with_code(
            "Tenant service is unavailable. Please try again shortly.",
            "tenant_service_unavailable",
        )
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::core_api::MockTenantApi;
    use crate::services::stripe::MockStripeService;
    use crate::state::test_state;
    use axum::{body::Body, http::Request, routing::post, Router};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(api: Arc<MockTenantApi>) -> Router {
        Router::new()
            .route("/signup/free", post(free_signup))
            .with_state(test_state(Arc::new(MockStripeService::new()), api))
    }

    fn request(apartments: u32) -> Request<Body> {
        let body = json!({
            "apartments": apartments,
            "subdomain": "tiny",
            "email": "owner@tiny.test",
            "firstName": "Ivo",
            "lastName": "Kos",
            "oauth": true,
        });
        Request::builder()
            .method("POST")
            .uri("/signup/free")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn creates_tenant_synchronously() {
        let api = Arc::new(MockTenantApi::new());
        let resp = router(api.clone()).oneshot(request(5)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["tenantId"], "tenant-tiny");
        assert_eq!(json["subdomain"], "tiny");
        assert_eq!(api.tenant_count(), 1);
    }

    #[tokio::test]
    async fn eight_units_is_invalid_plan_selection() {
        let api = Arc::new(MockTenantApi::new());
        let resp = router(api.clone()).oneshot(request(8)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "invalid_plan_selection");
        assert_eq!(api.create_call_count(), 0);
    }

    #[tokio::test]
    async fn taken_subdomain_is_conflict() {
        let api = Arc::new(MockTenantApi::new().with_tenant("tiny", None));
        let resp = router(api).oneshot(request(5)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["code"], "subdomain_taken");
    }

    #[tokio::test]
    async fn core_outage_is_503() {
        let api = Arc::new(MockTenantApi {
            fail_create_status: Some(500),
            ..Default::default()
        });
        let resp = router(api).oneshot(request(5)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["code"], "tenant_service_unavailable");
    }
}
