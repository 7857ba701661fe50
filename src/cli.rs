//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for clicklinker and the handlers
//! behind each subcommand.

use std::io::{self, BufRead, Write};
use std::path::Path;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use crate::config::StaticConfig;
use crate::errors::{ClicklinkerError, Result};
use crate::services::full_short_url;
use crate::storage::StorageFactory;
use crate::system::lifetime::{self, startup::build_link_service};

/// Clicklinker - URL shortener with asynchronous click tracking
#[derive(Parser, Debug)]
#[command(name = "clicklinker")]
#[command(version)]
#[command(about = "URL shortener with asynchronous click tracking", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shorten a long URL
    Create {
        /// Target URL (http or https)
        #[arg(long)]
        url: String,
    },

    /// Show click statistics for a short code
    Stats {
        /// Short code to inspect
        #[arg(long)]
        code: String,
    },

    /// Run the click pipeline and link monitor until Ctrl+C
    ///
    /// The pipeline records clicks for an embedding request handler that resolves
    /// redirects through the redirect service. This binary does not serve HTTP
    /// itself, so without such a handler the pipeline stays idle.
    RunServer,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    /// 是否需要在执行前加载并校验配置文件
    pub fn needs_config(&self) -> bool {
        !matches!(self, Commands::Config { .. })
    }
}

/// 执行子命令
pub async fn run_command(command: Commands, config: &StaticConfig) -> Result<()> {
    match command {
        Commands::Create { url } => create_link(config, &url).await,
        Commands::Stats { code } => link_stats(config, &code).await,
        Commands::RunServer => run_server(config).await,
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => config_generate(output_path, force),
    }
}

async fn create_link(config: &StaticConfig, url: &str) -> Result<()> {
    let storage = StorageFactory::create(&config.storage).await?;
    let service = build_link_service(config, &storage);

    let link = service.create_link(url).await?;
    println!(
        "{} Added short link: {} -> {}",
        "✓".bold().green(),
        link.short_code.cyan(),
        link.long_url.blue().underline()
    );
    println!(
        "  Short URL: {}",
        full_short_url(&config.server.base_url, &link.short_code).magenta()
    );
    Ok(())
}

async fn link_stats(config: &StaticConfig, code: &str) -> Result<()> {
    let storage = StorageFactory::create(&config.storage).await?;
    let service = build_link_service(config, &storage);

    let stats = service.get_link_stats(code).await?;
    println!("{} {}", "Short code:".bold(), stats.link.short_code.cyan());
    println!("{} {}", "Target:".bold(), stats.link.long_url.blue());
    println!(
        "{} {}",
        "Created:".bold(),
        stats.link.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "{} {}",
        "Total clicks:".bold(),
        stats.total_clicks.to_string().yellow()
    );
    Ok(())
}

async fn run_server(config: &StaticConfig) -> Result<()> {
    let ctx = lifetime::prepare_server_startup(config).await?;
    info!(
        "clicklinker running with {} backend, press Ctrl+C to stop",
        ctx.storage.backend_name()
    );

    lifetime::wait_for_signal().await?;
    let report = lifetime::perform_shutdown(ctx).await;
    if !report.is_complete() {
        return Err(ClicklinkerError::persistence(format!(
            "{} click events were not persisted before the grace period ended",
            report.pending
        )));
    }
    Ok(())
}

/// Generate example configuration file
fn config_generate(output_path: Option<String>, force: bool) -> Result<()> {
    let path = output_path.unwrap_or_else(|| "config.example.toml".to_string());

    // 文件已存在时，非 --force 模式下交互确认
    if !force && Path::new(&path).exists() {
        print!(
            "{} {} {}",
            "File already exists:".yellow(),
            path.blue(),
            "Overwrite? [y/N] ".yellow()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{}", "Aborted.".red());
            return Ok(());
        }
    }

    StaticConfig::default().save_to_file(&path)?;
    println!(
        "  {} {}",
        "Configuration file generated successfully".green(),
        path.blue()
    );
    Ok(())
}
