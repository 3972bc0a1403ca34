//! Configuration loading
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/default`, `config/local`
//! 3. the file given with `--config`
//! 4. `PENNYVAULT__SECTION__KEY` environment variables

use pennyvault_types::{AppConfig, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Load configuration from environment and optional config file
pub fn load(config_path: Option<&str>) -> anyhow::Result<AppConfig> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::File::with_name("config/local").required(false));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::with_name(path).required(true));
    }

    builder = builder
        .add_source(
            config::Environment::with_prefix("PENNYVAULT")
                .separator("__")
                .try_parsing(true),
        );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    Ok(config)
}

/// Initialize tracing/logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true).with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}
