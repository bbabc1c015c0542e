use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::response::IntoResponse;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tenant_provisioning::config::{Config, LogFormat};
use tenant_provisioning::responses::JsonResponse;
use tenant_provisioning::routes;
use tenant_provisioning::services::core_api::{LiveTenantApi, TenantApi};
use tenant_provisioning::services::stripe::{LiveStripeService, StripeService};
use tenant_provisioning::AppState;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(LogFormat::Text);
            error!(%err, "invalid configuration; refusing to start");
            return Err(err.into());
        }
    };
    init_tracing(config.log_format);

    let stripe = Arc::new(LiveStripeService::from_settings(
        &config.stripe,
        config.outbound_timeout,
    )) as Arc<dyn StripeService>;
    let tenant_api = Arc::new(
        LiveTenantApi::from_settings(&config.core_api, config.outbound_timeout)
            .context("failed to build core API client")?,
    ) as Arc<dyn TenantApi>;

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit.per_millisecond)
            .burst_size(config.rate_limit.burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .ok_or_else(|| anyhow!("invalid rate limiter settings"))?,
    );

    // Drop idle per-IP buckets
    let governor_limiter = governor_conf.limiter().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            governor_limiter.retain_recent();
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .context("FRONTEND_ORIGIN is not a valid header value")?,
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    let bind_addr = config.bind_addr;
    let state = AppState {
        stripe,
        tenant_api,
        config: Arc::new(config),
    };

    let public_routes = routes::public_routes().layer(GovernorLayer {
        config: governor_conf,
    });

    let app = routes::app_routes(public_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, make_service).await?;

    Ok(())
}
