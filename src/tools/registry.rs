use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::handler::{ToolDef, ToolHandler};
use super::schema::ToolSchema;
use crate::error::RegistryError;

/// Catalog of available tools, keyed by name. Built once at startup and
/// shared read-only with the transports.
pub struct ToolRegistry {
    tools: HashMap<String, ToolDef>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any previous tool with the same name.
    /// The schema is compiled here; an invalid schema leaves the registry untouched.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let schema = ToolSchema::compile(schema).map_err(|reason| RegistryError::InvalidSchema {
            name: name.clone(),
            reason,
        })?;
        self.tools.insert(
            name.clone(),
            ToolDef {
                name,
                description: description.into(),
                schema,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn add(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Result<Self, RegistryError> {
        self.register(name, description, schema, handler)?;
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    /// All definitions, sorted by name so listings are stable.
    pub fn definitions(&self) -> Vec<&ToolDef> {
        let mut defs: Vec<&ToolDef> = self.tools.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.definitions().into_iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use serde_json::json;

    struct ConstHandler(&'static str);

    #[async_trait::async_trait]
    impl ToolHandler for ConstHandler {
        async fn call(&self, _params: &Value) -> Result<Value, ToolError> {
            Ok(json!(self.0))
        }
    }

    fn empty_schema() -> Value {
        json!({"type": "object", "properties": {}})
    }

    #[test]
    fn lookup_registered_tool() {
        let reg = ToolRegistry::new()
            .add("read_file", "Read a file", empty_schema(), ConstHandler("a"))
            .unwrap();

        let def = reg.lookup("read_file").unwrap();
        assert_eq!(def.name, "read_file");
        assert_eq!(def.description, "Read a file");
        assert_eq!(def.input_schema(), &empty_schema());
    }

    #[test]
    fn lookup_missing_tool() {
        let reg = ToolRegistry::new();
        assert!(reg.lookup("nope").is_none());
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let mut reg = ToolRegistry::new();
        reg.register("t", "first", empty_schema(), ConstHandler("first"))
            .unwrap();
        reg.register("t", "second", empty_schema(), ConstHandler("second"))
            .unwrap();

        assert_eq!(reg.len(), 1);
        let def = reg.lookup("t").unwrap();
        assert_eq!(def.description, "second");
        assert_eq!(def.handler.call(&json!({})).await.unwrap(), json!("second"));
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let mut reg = ToolRegistry::new();
        let err = reg
            .register("bad", "", json!({"type": 42}), ConstHandler("x"))
            .unwrap_err();

        assert!(err.to_string().contains("bad"));
        assert!(reg.lookup("bad").is_none());
    }

    #[test]
    fn definitions_sorted_by_name() {
        let reg = ToolRegistry::new()
            .add("write_file", "", empty_schema(), ConstHandler("w"))
            .unwrap()
            .add("execute_command", "", empty_schema(), ConstHandler("e"))
            .unwrap()
            .add("read_file", "", empty_schema(), ConstHandler("r"))
            .unwrap();

        assert_eq!(
            reg.tool_names(),
            vec!["execute_command", "read_file", "write_file"]
        );
    }
}
