// LTM Gateway - Main Entry Point
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// CLI and MCP stdio server. All memory access routes through this gateway.
// Usage:
//   ltm-gateway serve                       # Run MCP server (stdio)
//   ltm-gateway status                      # Print engine status JSON
//   ltm-gateway read <uri>                  # One-shot resource read
//   ltm-gateway --config gw.json serve      # Load settings from JSON
//   ltm-gateway --data-dir /srv/ltm status  # Override data directory

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use ltm_gateway::{
    config::GatewayConfig,
    engine::TagSearch,
    mcp::{self, McpServer},
    paths, resources,
    session::Session,
    shutdown::ShutdownCoordinator,
    store::{LtmEngine, LtmStore},
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ltm-gateway")]
#[command(author = "Joseph Stone")]
#[command(version)]
#[command(about = "LTM Gateway - MCP long-term-memory gateway with LMDB-backed storage")]
struct Cli {
    /// Gateway config file (JSON). Missing fields take defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (STORE/ and LOGS/ live here)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run MCP server (stdio JSON-RPC)
    Serve,

    /// Print engine status
    Status,

    /// Resolve one resource URI and print its JSON
    Read {
        /// e.g. memories://recent/10 or memories://tag/rust/3
        uri: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Initialize logging (safe if already init). RUST_LOG wins over config.
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .try_init();

    let store_path = paths::store_dir(&config.data_dir);
    let store = LtmStore::open(&store_path, config.map_size_bytes())
        .with_context(|| format!("Failed to open LTM LMDB at {:?}", store_path))?;

    let engine = LtmEngine::new(store.clone(), config.awaken, config.sleep_recent_memories_limit);
    let session = Arc::new(Session::new(Box::new(engine)));
    let persona = session.initialize().context("Failed to initialize memory engine")?;
    log::info!("Persona {} loaded from {:?}", persona.persona_id, config.data_dir);

    let tags: Arc<dyn TagSearch> = Arc::new(store);

    match cli.command {
        Commands::Serve => {
            let call_log = if config.call_log {
                let path = paths::call_log_path(&config.data_dir);
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("Failed to create log dir {:?}", dir))?;
                }
                Some(path)
            } else {
                None
            };

            let server = McpServer::new(session.clone(), tags, call_log);
            let shutdown = Arc::new(ShutdownCoordinator::new(session, config.shutdown_timeout()));
            shutdown.clone().install()?;

            // Blocks until stdin closes
            mcp::run(&server, &shutdown);
        }

        Commands::Status => {
            let status = session.status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Read { uri } => {
            let text = resources::resolve(&uri, &session, tags.as_ref())
                .map_err(|e| anyhow!("[{}] {}", e.code(), e))?;
            println!("{}", text);
        }
    }

    Ok(())
}
