use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod cli;
mod commands;
mod config;
mod forms;
mod notify;
mod views;

#[cfg(test)]
mod testing;

use cli::{Args, Mode};
use config::Config;

/// File-only tracing at <FLEET_HOME>/console.log. Stdout stays reserved for
/// tables and notices.
fn initialize_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,fleet_console=debug,fleet_client=debug".into());

    std::fs::create_dir_all(&config.home).ok();

    let file_appender = tracing_appender::rolling::never(&config.home, config::LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard stops file logging
    std::mem::forget(guard);

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::load()?;

    initialize_tracing(&config)?;
    tracing::debug!(api_url = %config.api_url, "Console starting");

    match args.mode {
        Mode::Login { username, password } => {
            commands::auth::run_login(&config, username, password).await
        }
        Mode::Logout => commands::auth::run_logout(&config),
        Mode::Whoami => commands::auth::run_whoami(&config),
        Mode::Version => commands::system::run_version(&config).await,
        Mode::Config => commands::system::run_config(&config),
        mode => {
            let ctx = commands::protected(&config)?;
            let result = commands::dispatch(&ctx, &config, mode).await;
            commands::conclude(&ctx, result)
        }
    }
}
