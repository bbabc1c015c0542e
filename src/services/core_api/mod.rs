use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::tenant::{CreateTenantRequest, CreatedTenant, TenantSummary};

#[derive(Debug, Error)]
pub enum TenantApiError {
    #[error("core API request failed: {0}")]
    Http(reqwest::Error),
    #[error("core API call timed out")]
    Timeout,
    #[error("core API responded with status {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },
    #[error("core API returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TenantApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TenantApiError::Timeout
        } else {
            TenantApiError::Http(err)
        }
    }
}

impl TenantApiError {
    /// Whether a later attempt could succeed without anyone changing the request.
    pub fn is_retryable(&self) -> bool {
        match self {
            TenantApiError::Http(_) | TenantApiError::Timeout => true,
            TenantApiError::InvalidResponse(_) => true,
            TenantApiError::Api { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
        }
    }
}

/// Structured codes the core API uses for a subdomain uniqueness violation.
pub const DUPLICATE_SUBDOMAIN_CODES: &[&str] =
    &["subdomain_exists", "subdomain_taken", "duplicate_subdomain"];

/// Decides whether a create-tenant failure means "this subdomain already exists".
///
/// A structured code or `409 Conflict` is authoritative. Free text is only
/// consulted for 400/422 responses, and only when it names the subdomain and
/// says it is taken; anything vaguer is treated as a real failure.
pub fn is_duplicate_subdomain(err: &TenantApiError) -> bool {
    let TenantApiError::Api {
        status,
        message,
        code,
    } = err
    else {
        return false;
    };

    if let Some(code) = code {
        let code = code.trim().to_lowercase();
        return DUPLICATE_SUBDOMAIN_CODES.contains(&code.as_str());
    }

    if *status == StatusCode::CONFLICT {
        return true;
    }

    if *status == StatusCode::BAD_REQUEST || *status == StatusCode::UNPROCESSABLE_ENTITY {
        let text = message.to_lowercase();
        return text.contains("subdomain")
            && (text.contains("already exists")
                || text.contains("already taken")
                || text.contains("already in use"));
    }

    false
}

#[async_trait]
pub trait TenantApi: Send + Sync {
    /// `Ok(None)` when no tenant owns the subdomain.
    async fn find_tenant_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<TenantSummary>, TenantApiError>;

    async fn create_tenant(
        &self,
        req: &CreateTenantRequest,
    ) -> Result<CreatedTenant, TenantApiError>;

    async fn send_verification_email(&self, user_id: &str) -> Result<(), TenantApiError>;
}

mod live;
mod mock;

pub use live::LiveTenantApi;
#[allow(unused_imports)]
pub use mock::MockTenantApi;
