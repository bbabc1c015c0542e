use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{TenantApi, TenantApiError};
use crate::models::tenant::{CreateTenantRequest, CreatedTenant, TenantSummary};

#[derive(Debug, Deserialize)]
struct CoreErrorBody {
    message: Option<String>,
    error: Option<String>,
    code: Option<String>,
}

/// reqwest client for the core tenant API. Every call carries the service
/// credential as a bearer token and is bounded by the client timeout.
#[derive(Clone)]
pub struct LiveTenantApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LiveTenantApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TenantApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(
        settings: &crate::config::CoreApiSettings,
        timeout: Duration,
    ) -> Result<Self, TenantApiError> {
        Self::new(settings.base_url.clone(), settings.api_key.clone(), timeout)
    }

    fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = build_url(&self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }
}

fn build_url(base: &str, path: &str) -> String {
    let trimmed_base = base.trim_end_matches('/');
    let trimmed_path = path.trim_start_matches('/');
    format!("{}/{}", trimmed_base, trimmed_path)
}

fn error_from_body(status: StatusCode, body: &str) -> TenantApiError {
    let parsed = serde_json::from_str::<CoreErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|err| err.message.as_ref().or(err.error.as_ref()))
        .map(|msg| msg.trim().to_string())
        .filter(|msg| !msg.is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .unwrap_or_else(|| "core API request failed".to_string());
    TenantApiError::Api {
        status,
        message,
        code: parsed.and_then(|err| err.code),
    }
}

async fn send_request<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TenantApiError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(error_from_body(status, &body));
    }

    serde_json::from_str::<T>(&body).map_err(|err| TenantApiError::InvalidResponse(err.to_string()))
}

#[async_trait]
impl TenantApi for LiveTenantApi {
    async fn find_tenant_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<TenantSummary>, TenantApiError> {
        let path = format!("/tenants/by-subdomain/{}", urlencoding::encode(subdomain));
        let request = self.build_request(Method::GET, &path);
        match send_request::<TenantSummary>(request).await {
            Ok(tenant) => Ok(Some(tenant)),
            Err(TenantApiError::Api { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_tenant(
        &self,
        req: &CreateTenantRequest,
    ) -> Result<CreatedTenant, TenantApiError> {
        let request = self.build_request(Method::POST, "/tenants").json(req);
        send_request(request).await
    }

    async fn send_verification_email(&self, user_id: &str) -> Result<(), TenantApiError> {
        let request = self
            .build_request(Method::POST, "/users/send-verification-email")
            .json(&json!({ "user_id": user_id }));
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &body))
    }
}
