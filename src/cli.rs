use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, ConfigOverrides};
use crate::output::{invalid_repository_message, print_summary};
use crate::providers::{parse_block, GitLabProvider, ResponseCache};
use crate::renderer::{render_block, RenderOutcome};

#[derive(Parser)]
#[command(name = "gitlab-tooling")]
#[command(author, version, about = "GitLab repository overview", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./gitlab-tooling.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write JSON output to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Print JSON instead of the terminal summary
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// GitLab instance URL
    #[arg(short, long, global = true, env = "GITLAB_URL")]
    url: Option<String>,

    /// GitLab personal access token
    #[arg(short, long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Only list merge requests in the opened state
    #[arg(long, global = true, default_value_t = false)]
    open_only: bool,

    /// Cache REST API responses on disk
    #[arg(long, global = true, default_value_t = false)]
    cache: bool,

    /// Cache time to live (e.g. "30m", "1d")
    #[arg(long, global = true)]
    cache_ttl: Option<String>,

    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Hide additional item fields
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,

    /// Show a one-line project summary
    #[arg(long, global = true, default_value_t = false)]
    compact_info_card: bool,

    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a block once
    Render {
        /// Block file, read from stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Re-render a block periodically until interrupted
    Watch {
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Polling interval (e.g. "5m"), defaults to the configured one
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Retry the failed jobs of a pipeline of the block's repository
    RetryPipeline {
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(long)]
        pipeline: u64,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Remove every cached response
    Flush,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.url.clone(),
            token: self.token.clone(),
            open_merge_requests_only: self.open_only.then_some(true),
            cache_enabled: self.cache.then_some(true),
            cache_expiration: self.cache_ttl.clone(),
            cache_directory: self.cache_dir.clone(),
            compact_info_card: self.compact_info_card.then_some(true),
            compact_mode: self.compact.then_some(true),
            polling_interval: match &self.command {
                Commands::Watch { interval, .. } => interval.clone(),
                _ => None,
            },
            debug: self.debug.then_some(true),
        }
    }

    /// Loads the configuration file and applies command line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// duration setting is malformed.
    pub fn load_config(&self) -> Result<Config> {
        let config = Config::load(self.config.as_deref())?.with_overrides(self.overrides());
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Output written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    fn present(&self, outcome: &RenderOutcome, config: &Config) -> Result<()> {
        if self.json || self.output.is_some() {
            self.emit(outcome)
        } else {
            print_summary(
                outcome,
                &config.display,
                config.gitlab.open_merge_requests_only,
            );
            Ok(())
        }
    }

    async fn execute_render(&self, config: &Config, file: Option<&Path>) -> Result<()> {
        let block = read_block(file)?;
        let provider = GitLabProvider::new(config)?;

        let outcome = render_block(&provider, &config.gitlab.base_url, &block).await?;
        self.present(&outcome, config)
    }

    async fn execute_watch(&self, config: &Config, file: Option<&Path>) -> Result<()> {
        let interval = config.polling.interval()?;
        if interval == Duration::ZERO {
            bail!("Polling interval must be greater than zero");
        }

        let block = read_block(file)?;
        let provider = GitLabProvider::new(config)?;

        info!("Polling every {}s, press Ctrl-C to stop", interval.as_secs());

        loop {
            match render_block(&provider, &config.gitlab.base_url, &block).await {
                Ok(outcome) => self.present(&outcome, config)?,
                Err(e) => error!("Rendering failed: {e}"),
            }

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl-C")?;
                    info!("Stopping");
                    return Ok(());
                }
                () = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn execute_cache_flush(config: &Config) -> Result<()> {
        let cache = ResponseCache::new(config.cache.directory()?, config.cache.ttl()?);
        let removed = cache.flush();
        println!(
            "Removed {removed} cached responses from {}",
            cache.directory().display()
        );
        Ok(())
    }

    async fn execute_retry_pipeline(
        &self,
        config: &Config,
        file: Option<&Path>,
        pipeline: u64,
    ) -> Result<()> {
        let block = read_block(file)?;
        let spec = parse_block(&config.gitlab.base_url, &block);
        let Some(reference) = spec.source_info else {
            bail!(invalid_repository_message(block.trim()));
        };

        let provider = GitLabProvider::new(config)?;
        let retried = provider
            .retry_pipeline(&reference, pipeline)
            .await
            .with_context(|| format!("Failed to retry pipeline {pipeline}"))?;

        info!("Pipeline {} is now {}", retried.id, retried.status);
        self.emit(&retried)
    }

    pub async fn execute(&self, config: &Config) -> Result<()> {
        match &self.command {
            Commands::Render { file } if config.polling.enabled => {
                self.execute_watch(config, file.as_deref()).await
            }
            Commands::Render { file } => self.execute_render(config, file.as_deref()).await,
            Commands::Watch { file, .. } => self.execute_watch(config, file.as_deref()).await,
            Commands::Cache {
                action: CacheCommand::Flush,
            } => Self::execute_cache_flush(config),
            Commands::RetryPipeline { file, pipeline } => {
                self.execute_retry_pipeline(config, file.as_deref(), *pipeline)
                    .await
            }
        }
    }
}

/// Reads a block from `file`, or from stdin when no file is given.
fn read_block(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read block file: {}", path.display())),
        None => {
            let mut block = String::new();
            std::io::stdin()
                .read_to_string(&mut block)
                .context("Failed to read block from stdin")?;
            Ok(block)
        }
    }
}
