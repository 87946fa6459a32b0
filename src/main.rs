use anyhow::{Context, Result};
use clap::Parser;
use gridlog::cli::Cli;
use gridlog::config::Config;
use gridlog::driver::TelemetryDriver;
use gridlog::logging::{get_logger, init_logging};
use gridlog::persistence::StatePublisher;
use gridlog::scheduler::Scheduler;
use gridlog::session::SessionClient;
use gridlog::timeseries::TimeseriesSink;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env_overrides();
    cli.apply(&mut config);

    init_logging(&config.logging).context("Failed to initialize logging")?;
    let logger = get_logger("main");
    logger.info(&format!("gridlog {} starting up", env!("APP_VERSION")));

    if let Err(e) = config.validate() {
        logger.error(&format!("Invalid configuration: {}", e));
        return Err(e.into());
    }
    let scheduler = Scheduler::from_secs(config.poll_interval_secs)?;

    let session = SessionClient::login(&config.gateway)
        .await
        .with_context(|| format!("Login to {} failed", config.gateway.hostname))?;

    let sink = match &config.output.outfile {
        Some(path) => TimeseriesSink::open_append(path)?,
        None => TimeseriesSink::stdout(),
    };
    let publisher = config.output.statefile.as_ref().map(StatePublisher::new);
    let mut driver = TelemetryDriver::new(Box::new(session), sink, publisher);

    if cli.once {
        let sample = driver.poll_cycle().await;
        logger.info(&format!("Sample: {}", serde_json::to_string(&sample)?));
        if let Some(path) = &config.output.statefile {
            match StatePublisher::new(path).load() {
                Ok(Some(doc)) => logger.info(&format!(
                    "Published state: grid_up={} percentage={:?} last_updated={}",
                    doc.grid_up, doc.percentage, doc.last_updated
                )),
                Ok(None) => logger.warn("No state document was published"),
                Err(e) => logger.warn(&format!("Failed to read back state document: {}", e)),
            }
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    driver.run(&scheduler, shutdown_rx).await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
