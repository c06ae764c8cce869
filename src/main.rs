use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use quiz_engine::{
    config::{get_config, init_config, LogFormat},
    database::{
        pool::{create_pool, run_migrations},
        PgAttemptRepository, PgQuizRepository,
    },
    services::expiry_service::ExpiryService,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config()?;
    init_tracing(config.log_format);

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    info!("database ready");

    let sweeper = ExpiryService::new(
        Arc::new(PgQuizRepository::new(pool.clone())),
        Arc::new(PgAttemptRepository::new(pool)),
    );

    if config.expiry_sweep_interval_secs == 0 {
        let expired = sweeper.expire_overdue(Utc::now()).await?;
        info!(expired, "single expiry pass finished");
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.expiry_sweep_interval_secs));
    info!(
        interval_secs = config.expiry_sweep_interval_secs,
        "expiry sweeper running"
    );
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweeper.expire_overdue(Utc::now()).await {
                    tracing::error!(error = ?e, "expiry sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
