use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{TenantApi, TenantApiError};
use crate::models::tenant::{CreateTenantRequest, CreatedTenant, TenantSummary};

/// In-memory core API that enforces subdomain uniqueness like the real one.
#[derive(Default)]
pub struct MockTenantApi {
    pub tenants: Mutex<HashMap<String, CreateTenantRequest>>,
    pub lookup_calls: Mutex<usize>,
    pub create_calls: Mutex<usize>,
    pub verification_emails: Mutex<Vec<String>>,
    /// Status returned by every create call instead of creating a tenant.
    pub fail_create_status: Option<u16>,
    pub fail_lookup: bool,
    pub fail_verification: bool,
    /// Skip the lookup hit so duplicates surface from create, as in a concurrent race.
    pub hide_existing_on_lookup: bool,
}

impl MockTenantApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(self, subdomain: &str, checkout_session_id: Option<&str>) -> Self {
        let req = CreateTenantRequest {
            subdomain: subdomain.to_string(),
            user: crate::models::tenant::TenantAdmin {
                email: format!("admin@{}.test", subdomain),
                first_name: "Existing".into(),
                last_name: "Admin".into(),
                password: "existing".into(),
            },
            plan_id: 2,
            processor: crate::models::tenant::ProcessorRefs {
                stripe_checkout_session_id: checkout_session_id.map(str::to_string),
                ..Default::default()
            },
        };
        self.tenants
            .lock()
            .unwrap()
            .insert(subdomain.to_string(), req);
        self
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.lock().unwrap().len()
    }

    pub fn create_call_count(&self) -> usize {
        *self.create_calls.lock().unwrap()
    }

    pub fn sent_verification_emails(&self) -> Vec<String> {
        self.verification_emails.lock().unwrap().clone()
    }
}

#[async_trait]
impl TenantApi for MockTenantApi {
    async fn find_tenant_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<TenantSummary>, TenantApiError> {
        *self.lookup_calls.lock().unwrap() += 1;
        if self.fail_lookup {
            return Err(TenantApiError::Timeout);
        }
        if self.hide_existing_on_lookup {
            return Ok(None);
        }
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .get(subdomain)
            .map(|req| TenantSummary {
                id: format!("tenant-{}", req.subdomain),
                subdomain: req.subdomain.clone(),
                stripe_checkout_session_id: req.processor.stripe_checkout_session_id.clone(),
            }))
    }

    async fn create_tenant(
        &self,
        req: &CreateTenantRequest,
    ) -> Result<CreatedTenant, TenantApiError> {
        *self.create_calls.lock().unwrap() += 1;
        if let Some(status) = self.fail_create_status {
            return Err(TenantApiError::Api {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message: "mock core API failure".into(),
                code: None,
            });
        }

        let mut tenants = self.tenants.lock().unwrap();
        if tenants.contains_key(&req.subdomain) {
            return Err(TenantApiError::Api {
                status: StatusCode::BAD_REQUEST,
                message: format!("Tenant with subdomain '{}' already exists", req.subdomain),
                code: Some("subdomain_exists".into()),
            });
        }
        tenants.insert(req.subdomain.clone(), req.clone());
        Ok(CreatedTenant {
            tenant_id: format!("tenant-{}", req.subdomain),
            user_id: Some(format!("user-{}", req.subdomain)),
        })
    }

    async fn send_verification_email(&self, user_id: &str) -> Result<(), TenantApiError> {
        if self.fail_verification {
            return Err(TenantApiError::Api {
                status: StatusCode::BAD_GATEWAY,
                message: "mock mail relay down".into(),
                code: None,
            });
        }
        self.verification_emails
            .lock()
            .unwrap()
            .push(user_id.to_string());
        Ok(())
    }
}
