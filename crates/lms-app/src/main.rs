//! `lms` binary.

use anyhow::{Context, Result};
use clap::Parser;

use lms_app::{App, AppConfig, Backends, Cli};

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match cli.config.clone().or_else(AppConfig::default_path) {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(filter) = &cli.log_filter {
        config.log_filter = Some(filter.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _telemetry = lms_telemetry::init("lms", &config.log_config())
        .context("initializing logging")?;

    let backends = if cli.ephemeral {
        Backends::ephemeral()
    } else {
        Backends::open(&config.data_dir())?
    };

    let app = App::start(backends, config.session_config());
    let mut stdout = std::io::stdout();
    app.run(cli.command, &mut stdout).await
}
