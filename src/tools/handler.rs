use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::schema::ToolSchema;
use crate::error::ToolError;

/// A tool's execution handler. Receives parameters that already passed
/// the tool's input schema.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, params: &Value) -> Result<Value, ToolError>;
}

/// A registered tool: name, description and compiled input schema + handler.
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
    pub(crate) handler: Arc<dyn ToolHandler>,
}

impl ToolDef {
    /// Raw JSON schema as registered, for tool listings.
    pub fn input_schema(&self) -> &Value {
        self.schema.raw()
    }
}

impl std::fmt::Debug for ToolDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDef")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", self.schema.raw())
            .finish_non_exhaustive()
    }
}
