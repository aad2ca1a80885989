#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Failure of an external program run on behalf of a tool.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} wrote to stderr: {stderr}")]
    Stderr { program: String, stderr: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid input schema for tool '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("mcp initialization failed: {0}")]
    Initialize(#[from] rmcp::service::ServerInitializeError),
    #[error("mcp service task failed: {0}")]
    Service(#[from] tokio::task::JoinError),
}
