use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Server configuration shared by both transports.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address for the HTTP transport.
    pub bind: SocketAddr,
    /// External database program backing `query_database`. `None` disables the tool.
    pub database: Option<DatabaseConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub program: PathBuf,
    /// Arguments placed before the per-query arguments.
    pub args: Vec<String>,
}
