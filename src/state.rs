use crate::config::Config;
use crate::services::core_api::TenantApi;
use crate::services::stripe::StripeService;
use std::sync::Arc;

/// Handles to every external system a request may touch. Nothing here is
/// mutable; each request works only through these clients.
#[derive(Clone)]
pub struct AppState {
    pub stripe: Arc<dyn StripeService>,
    pub tenant_api: Arc<dyn TenantApi>,
    pub config: Arc<Config>,
}

#[cfg(test)]
pub(crate) fn test_config() -> Arc<Config> {
    use crate::config::{CoreApiSettings, LogFormat, RateLimitSettings, StripeSettings};

    Arc::new(Config {
        frontend_origin: "https://app.example.com".into(),
        stripe: StripeSettings {
            secret_key: "sk_test_stub".into(),
            webhook_secret: crate::services::stripe::MOCK_WEBHOOK_SECRET.into(),
            webhook_tolerance_seconds: 300,
        },
        core_api: CoreApiSettings {
            base_url: "http://core.invalid".into(),
            api_key: "core-key".into(),
        },
        trial_period_days: 30,
        outbound_timeout: std::time::Duration::from_secs(2),
        bind_addr: std::net::SocketAddr::from(([127, 0, 0, 1], 0)),
        log_format: LogFormat::Text,
        rate_limit: RateLimitSettings {
            per_millisecond: 200,
            burst: 20,
        },
    })
}

#[cfg(test)]
pub(crate) fn test_state(
    stripe: Arc<crate::services::stripe::MockStripeService>,
    tenant_api: Arc<crate::services::core_api::MockTenantApi>,
) -> AppState {
    AppState {
        stripe,
        tenant_api,
        config: test_config(),
    }
}
