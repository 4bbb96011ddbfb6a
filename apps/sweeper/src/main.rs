mod config;

use std::sync::Arc;

use config::Config;
use pricewatch_core::flyers::{
    spawn_archive_sweep, FlyerLifecycleService, FlyerLifecycleServiceTrait,
};
use pricewatch_core::utils::time_utils::SystemClock;
use pricewatch_storage_sqlite::{db, FlyerRepository};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let log_format = std::env::var("PW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);
    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let repository = Arc::new(FlyerRepository::new(Arc::clone(&pool), writer));
    let service: Arc<dyn FlyerLifecycleServiceTrait> = Arc::new(FlyerLifecycleService::new(
        repository,
        Arc::new(SystemClock),
        config.lifecycle.clone(),
    ));

    let sweep = spawn_archive_sweep(service, &config.lifecycle);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down archive sweep");
    sweep.abort();
    Ok(())
}
