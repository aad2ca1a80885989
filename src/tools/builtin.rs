//! Tools that ship with the server.
//!
//! `hello_world` and `echo` run inline. `query_database` forwards to an
//! external database program through a [`CommandRunner`].

use async_trait::async_trait;
use serde_json::{json, Value};

use super::command::{CommandRunner, ProcessRunner};
use super::handler::ToolHandler;
use super::registry::ToolRegistry;
use crate::config::Config;
use crate::error::{RegistryError, ToolError};

pub struct HelloWorldTool;

impl HelloWorldTool {
    pub const NAME: &'static str = "hello_world";
    pub const DESCRIPTION: &'static str = "Returns a friendly greeting";

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }
}

#[async_trait]
impl ToolHandler for HelloWorldTool {
    async fn call(&self, _params: &Value) -> Result<Value, ToolError> {
        Ok(json!({ "message": "Hello, world!" }))
    }
}

pub struct EchoTool;

impl EchoTool {
    pub const NAME: &'static str = "echo";
    pub const DESCRIPTION: &'static str = "Echoes the given text back";

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to echo back"
                }
            },
            "required": ["text"]
        })
    }
}

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, params: &Value) -> Result<Value, ToolError> {
        let text = params["text"]
            .as_str()
            .ok_or_else(|| ToolError::failed("text must be a string"))?;
        Ok(json!({ "text": text }))
    }
}

/// Runs a query through the configured database program and returns its stdout.
pub struct DatabaseQueryTool<R> {
    runner: R,
}

impl<R: CommandRunner> DatabaseQueryTool<R> {
    pub const NAME: &'static str = "query_database";
    pub const DESCRIPTION: &'static str =
        "Run a query against the database using the configured database command";

    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Query text passed to the database command"
                },
                "database": {
                    "type": "string",
                    "description": "Database name or path, passed before the query"
                }
            },
            "required": ["query"]
        })
    }
}

#[async_trait]
impl<R: CommandRunner> ToolHandler for DatabaseQueryTool<R> {
    async fn call(&self, params: &Value) -> Result<Value, ToolError> {
        let query = params["query"]
            .as_str()
            .ok_or_else(|| ToolError::failed("query must be a string"))?;

        let mut args = Vec::with_capacity(2);
        if let Some(db) = params["database"].as_str() {
            args.push(db.to_string());
        }
        args.push(query.to_string());

        let output = self.runner.run(&args).await?;
        Ok(json!({ "output": output }))
    }
}

/// Build the default registry for a server. `query_database` is only
/// registered when a database program is configured.
pub fn default_registry(config: &Config) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new()
        .add(
            HelloWorldTool::NAME,
            HelloWorldTool::DESCRIPTION,
            HelloWorldTool::schema(),
            HelloWorldTool,
        )?
        .add(
            EchoTool::NAME,
            EchoTool::DESCRIPTION,
            EchoTool::schema(),
            EchoTool,
        )?;

    if let Some(ref db) = config.database {
        let runner = ProcessRunner::new(&db.program).with_args(db.args.iter().cloned());
        registry.register(
            DatabaseQueryTool::<ProcessRunner>::NAME,
            DatabaseQueryTool::<ProcessRunner>::DESCRIPTION,
            DatabaseQueryTool::<ProcessRunner>::schema(),
            DatabaseQueryTool::new(runner),
        )?;
    }

    Ok(registry)
}
