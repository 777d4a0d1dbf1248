mod config;
mod generate_cmd;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};

use courseforge_core::gateway::{GatewayConfig, HttpGenerationGateway};

#[derive(Parser)]
#[command(name = "courseforge", about = "AI course plan generator")]
struct Cli {
    /// Generation service URL (overrides COURSEFORGE_API_URL env var)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a courseforge config file
    Init {
        /// Generation service URL to record
        #[arg(long, default_value = GatewayConfig::DEFAULT_BASE_URL)]
        url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Check the generation service health endpoint
    Health,
    /// Generate a course plan interactively from textbook text
    Generate {
        /// Read the textbook text from this file instead of prompting
        #[arg(long)]
        file: Option<String>,
        /// Number of modules to split the course into (2-6)
        #[arg(long, default_value_t = 4)]
        module_count: u8,
        /// Target grade level, e.g. "3rd grade"
        #[arg(long)]
        grade_level: Option<String>,
        /// Subject area, e.g. "science"
        #[arg(long)]
        subject: Option<String>,
    },
}

/// Execute `courseforge init`: write the config file.
fn cmd_init(url: &str, force: bool) -> Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        api: config::ApiSection {
            url: url.to_string(),
            timeout_secs: None,
        },
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  api.url = {url}");
    Ok(())
}

/// Execute `courseforge health`: query the service health endpoint.
async fn cmd_health(config: GatewayConfig) -> Result<()> {
    let base_url = config.base_url.clone();
    let gateway = HttpGenerationGateway::new(config)?;
    let health = gateway.health().await?;

    println!("Service at {base_url}:");
    println!("  status       = {}", health.status);
    println!("  service      = {}", health.service);
    println!("  config_valid = {}", health.config_valid);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { url, force } => {
            cmd_init(&url, force)?;
        }
        Commands::Health => {
            let config = config::resolve(cli.api_url.as_deref());
            cmd_health(config).await?;
        }
        Commands::Generate {
            file,
            module_count,
            grade_level,
            subject,
        } => {
            let config = config::resolve(cli.api_url.as_deref());
            let options = generate_cmd::GenerateOptions {
                file,
                module_count,
                grade_level,
                subject,
            };
            generate_cmd::run_generate(config, options).await?;
        }
    }

    Ok(())
}
