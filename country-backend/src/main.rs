use country_backend::config::ServiceConfig;
use country_backend::logging;
use country_backend::service::{self, AppState};

use anyhow::Result;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

enum Command {
    Serve,
    Refresh,
}

impl Command {
    fn from_args() -> Result<Self> {
        match std::env::args().nth(1).as_deref() {
            None | Some("serve") => Ok(Command::Serve),
            Some("refresh") => Ok(Command::Refresh),
            Some(other) => anyhow::bail!("Unknown command '{}', expected 'serve' or 'refresh'", other),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = Command::from_args()?;

    // Load configuration
    let config_path =
        std::env::var("COUNTRY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = ServiceConfig::load_or_default(&config_path)?;

    // Initialize logging
    let _logging_guard = logging::init_logging(&config.log_dir, "country-backend", &config.log_level)?;

    tracing::info!("Country backend starting...");
    tracing::info!("Records stored under {}", config.data_dir.display());
    tracing::info!("Summary image at {}", config.summary_image_path().display());

    let state = AppState::from_config(&config).await?;
    tracing::info!("Loaded {} countries", state.store.count().await);

    match command {
        Command::Refresh => {
            let result = state.refresher.refresh().await?;
            tracing::info!(
                "{}: {} countries",
                result.message,
                result.total_countries
            );
        }
        Command::Serve => service::serve(&config, state).await?,
    }

    Ok(())
}
