pub mod billing;
pub mod signup;
pub mod stripe;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use crate::responses::JsonResponse;
use crate::state::AppState;

/// Signup and checkout endpoints called by the marketing site. These are the
/// routes that get rate limited.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout-sessions", post(billing::create_checkout_session))
        .route("/signup/free", post(signup::free_signup))
}

/// Processor callbacks. Never rate limited: throttling a delivery only
/// produces another delivery.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/payments", post(stripe::webhook))
}

pub async fn root() -> impl IntoResponse {
    JsonResponse::success("Tenant provisioning service is running")
}

pub fn app_routes(public: Router<AppState>) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .merge(public)
        .merge(webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::core_api::MockTenantApi;
    use crate::services::stripe::MockStripeService;
    use crate::state::test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        app_routes(public_routes()).with_state(test_state(
            Arc::new(MockStripeService::new()),
            Arc::new(MockTenantApi::new()),
        ))
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let resp = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_route_is_mounted() {
        let req = Request::builder()
            .method("POST")
            .uri("/webhooks/payments")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        // Reaches the handler, which rejects the unsigned body.
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_only_accepts_post() {
        let req = Request::builder()
            .uri("/webhooks/payments")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
