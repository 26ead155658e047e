use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sellbetter_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    outbox::spawn_dispatcher,
    routes::app,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sellbetter_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    config
        .cloudinary
        .as_ref()
        .context("CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET must be set")?;
    config
        .resend
        .as_ref()
        .context("RESEND_API_KEY must be set")?;
    if config.paypal.is_none() {
        tracing::warn!("PayPal credentials not set, payment ids cannot be verified");
    }

    let pool = create_pool(&config.database_url).await?;
    let orm = create_orm_conn(&pool);
    run_migrations(&orm).await?;

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let outbox_every = Duration::from_secs(config.outbox_interval_secs.max(1));
    let state = AppState::new(pool, orm, config);

    let dispatcher = spawn_dispatcher(state.clone(), outbox_every);
    let app = app(state);

    tracing::info!("listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    dispatcher.abort();
    Ok(())
}
