mod auth;
mod cli;
mod config;
mod error;
mod output;
mod providers;
mod renderer;
mod time_units;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let default_filter = if config.logging.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    output::print_banner();

    info!("Starting gitlab-tooling against {}", config.gitlab.base_url);
    cli.execute(&config).await?;

    Ok(())
}
