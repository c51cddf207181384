mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(qcprice_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, cron = %config.update_cron, "starting qcprice-server");

    let pool_config = qcprice_db::PoolConfig::from_app_config(&config);
    let pool = qcprice_db::connect_pool(&config.database_url, pool_config).await?;
    qcprice_db::health_check(&pool).await?;
    let applied = qcprice_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let repository = Arc::new(qcprice_db::PgProductRepository::new(pool));
    let tracker = Arc::new(qcprice_scraper::PriceTracker::from_app_config(
        &config, repository,
    )?);

    let mut scheduler =
        scheduler::build_scheduler(Arc::clone(&tracker), &config.update_cron).await?;

    shutdown_signal().await;
    scheduler.shutdown().await?;
    tracker.release().await;
    tracing::info!("qcprice-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
