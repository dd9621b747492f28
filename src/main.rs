use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passport_market::config::{
    database::{create_pool, run_migrations},
    tls::TlsSettings,
    AppConfig,
};
use passport_market::repositories::PgInquiryRepository;
use passport_market::services::ExpirySchedulerService;
use passport_market::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // INFO by default; override with RUST_LOG when debugging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "passport_market=info,tower_http=info,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let tls = TlsSettings::from_env()?;

    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;

    let inquiries = Arc::new(PgInquiryRepository::new(pool));
    let state = AppState::new(config.clone(), inquiries.clone());
    let app = create_app(state);

    let scheduler = ExpirySchedulerService::new(inquiries, config.expiry.clone());
    tokio::spawn(scheduler.run());

    if let Some(tls) = tls {
        let rustls_config = tls.load().await?;
        let addr = SocketAddr::from(([0, 0, 0, 0], tls.port));

        tracing::info!("Starting inquiry service with TLS on https://{}", addr);

        axum_server::bind_rustls(addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
    } else {
        let addr: SocketAddr = config
            .server_address()
            .parse()
            .with_context(|| format!("Invalid server address {}", config.server_address()))?;

        tracing::info!("Starting inquiry service on http://{}", addr);
        tracing::warn!("TLS is disabled; terminate TLS in front of this service");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
