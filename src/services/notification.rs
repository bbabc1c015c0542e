use tracing::{info, warn};

use crate::services::core_api::TenantApi;

/// Asks the core API to send the account-verification email for a freshly
/// created administrator. Failures are logged and swallowed: the tenant
/// already exists and must not be rolled back or reported as failed.
///
/// Returns whether the request was accepted.
pub async fn send_verification_email(
    tenant_api: &dyn TenantApi,
    user_id: &str,
    subdomain: &str,
) -> bool {
    match tenant_api.send_verification_email(user_id).await {
        Ok(()) => {
            info!(%user_id, %subdomain, "verification email requested");
            true
        }
        Err(err) => {
            warn!(?err, %user_id, %subdomain, "failed to send verification email; tenant left in place");
            false
        }
    }
}
