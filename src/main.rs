//! MimiChat CLI
//!
//! Commands:
//!   serve - Start the HTTP proxy (default)
//!   diag  - Show the resolved provider configuration
//!   ask   - Send one message through the full pipeline

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use mimichat::{persona, AppState, ChatInput, ChatPipeline, Config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mimichat")]
#[command(about = "Storefront chat proxy for OpenAI-compatible completion APIs")]
#[command(version)]
struct Cli {
    /// Optional TOML configuration file (environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (defaults to PORT or 8787)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show provider, model, endpoint and whether an API key is set
    Diag,

    /// Send one message through the pipeline and print the reply
    Ask {
        /// Message text
        msg: String,

        /// Affinity level passed to the persona
        #[arg(short, long, default_value = "1")]
        level: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mimichat=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            if !config.has_key() {
                tracing::warn!(
                    env = config.provider.key_env(),
                    "no API key configured; every chat will get the fallback reply"
                );
            }
            let state = AppState::from_config(config)?;
            mimichat::serve(state, port).await?;
        }

        Commands::Diag => {
            println!("{}\n", "MimiChat configuration".bold());
            println!("  Provider:  {}", config.provider.name());
            println!("  Model:     {}", config.model());
            println!("  Endpoint:  {}", config.base_url());
            let key = if config.has_key() {
                "present".green()
            } else {
                format!("missing (set {})", config.provider.key_env()).red()
            };
            println!("  API key:   {}", key);
            println!("  Port:      {}", config.port);
            println!("  Origins:   {}", config.allowed_origins.join(", "));
        }

        Commands::Ask { msg, level } => {
            if msg.trim().is_empty() {
                println!("{}", persona::EMPTY_MESSAGE_REPLY);
                return Ok(());
            }
            let pipeline = ChatPipeline::from_config(&config)?;
            let input = ChatInput {
                msg,
                level,
                history: Vec::new(),
            };
            match pipeline.answer(&input).await {
                Ok(reply) => println!("{}", reply),
                Err(e) => {
                    eprintln!("{} {}", "Upstream error:".red(), e);
                    println!("{}", pipeline.fallback());
                }
            }
        }
    }

    Ok(())
}
