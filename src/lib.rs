pub mod config;
pub mod error;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{Config, DatabaseConfig};
pub use error::{CommandError, RegistryError, ServerError, ToolError};
pub use tools::builtin::default_registry;
pub use tools::{
    CommandRunner, Dispatcher, ProcessRunner, ToolDef, ToolHandler, ToolRegistry, ValidationIssue,
};
pub use types::{Envelope, InvocationRequest, InvocationResult};
