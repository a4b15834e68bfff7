//! Movies ETL entry point.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use movies_etl::config::LogFormat;
use movies_etl::{Dependencies, EtlConfig, EtlError};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), EtlError> {
    dotenv::dotenv().ok();

    let config = EtlConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        interval_secs = config.interval.as_secs(),
        "Starting movies ETL"
    );

    let mut dependencies = Dependencies::new(&config).await.map_err(|e| {
        error!(error = %e, "Failed to initialize dependencies");
        e
    })?;

    tokio::select! {
        result = dependencies.orchestrator.run() => {
            if let Err(e) = &result {
                error!(error = %e, "Pipeline stopped with an error");
            }
            result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received shutdown signal");
        }
    }

    info!("Movies ETL stopped");
    Ok(())
}
