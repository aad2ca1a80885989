//! mcp-dispatch server.
//!
//! Usage:
//!   mcp-dispatch http --bind 127.0.0.1:3000
//!   mcp-dispatch --db-command sqlite3 --db-arg -json stdio
//!
//! Logs go to stderr; set RUST_LOG to change the level.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mcp_dispatch::config::DEFAULT_BIND;
use mcp_dispatch::transport::{http, stdio};
use mcp_dispatch::{default_registry, Config, DatabaseConfig, Dispatcher};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mcp-dispatch", version, about = "Serve schema-validated tools over HTTP or stdio")]
struct Cli {
    /// Database program backing the query_database tool
    #[arg(long, global = true, env = "MCP_DB_COMMAND")]
    db_command: Option<PathBuf>,

    /// Extra argument passed to the database program before each query (repeatable)
    #[arg(long = "db-arg", global = true, allow_hyphen_values = true)]
    db_args: Vec<String>,

    #[command(subcommand)]
    transport: Transport,
}

#[derive(Subcommand)]
enum Transport {
    /// JSON over HTTP: POST /mcp {"tool": ..., "params": {...}}
    Http {
        /// Listen address
        #[arg(long, env = "MCP_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,
    },
    /// JSON-RPC over stdin/stdout
    Stdio,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config {
            database: self.db_command.as_ref().map(|program| DatabaseConfig {
                program: program.clone(),
                args: self.db_args.clone(),
            }),
            ..Config::default()
        };
        if let Transport::Http { bind } = self.transport {
            config.bind = bind;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(cli));

    // A stdin read parked on the blocking pool cannot be cancelled, so the
    // runtime must not wait for it.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();

    let registry = default_registry(&config).context("failed to build tool registry")?;
    info!(tools = ?registry.tool_names(), "registered tools");
    let dispatcher = Dispatcher::new(registry);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
            }
        }
    });

    match cli.transport {
        Transport::Http { .. } => {
            let listener = http::bind(config.bind).await?;
            http::serve(listener, dispatcher, shutdown).await?;
        }
        Transport::Stdio => stdio::serve_stdio(dispatcher, shutdown).await?,
    }

    Ok(())
}
