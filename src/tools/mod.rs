pub mod builtin;
pub mod command;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod schema;

pub use command::{CommandRunner, ProcessRunner};
pub use dispatcher::Dispatcher;
pub use handler::{ToolDef, ToolHandler};
pub use registry::ToolRegistry;
pub use schema::{ToolSchema, ValidationIssue};
