use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::Value;

/// One schema violation. `path` is a JSON Pointer into the parameters
/// (empty for the root object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// A tool's input schema, compiled once at registration.
pub struct ToolSchema {
    raw: Value,
    compiled: JSONSchema,
}

impl ToolSchema {
    pub fn compile(raw: Value) -> Result<Self, String> {
        let compiled = JSONSchema::compile(&raw).map_err(|e| e.to_string())?;
        Ok(Self { raw, compiled })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Validate `params`, collecting every violation rather than stopping at the first.
    pub fn validate(&self, params: &Value) -> Result<(), Vec<ValidationIssue>> {
        self.compiled.validate(params).map_err(|errors| {
            errors
                .map(|e| ValidationIssue {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_schema() -> ToolSchema {
        ToolSchema::compile(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "filter": {
                    "type": "object",
                    "properties": {
                        "limit": { "type": "integer" },
                        "tags": { "type": "array", "items": { "type": "string" } }
                    }
                }
            },
            "required": ["query"]
        }))
        .unwrap()
    }

    #[test]
    fn accepts_valid_params() {
        let schema = search_schema();
        let params = json!({"query": "radio", "filter": {"limit": 5, "tags": ["jazz"]}});
        assert!(schema.validate(&params).is_ok());
    }

    #[test]
    fn reports_missing_required_property() {
        let issues = search_schema().validate(&json!({})).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "");
        assert!(issues[0].message.contains("query"));
    }

    #[test]
    fn reports_nested_paths() {
        let params = json!({"query": "x", "filter": {"limit": "ten", "tags": ["ok", 7]}});
        let issues = search_schema().validate(&params).unwrap_err();

        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"/filter/limit"));
        assert!(paths.contains(&"/filter/tags/1"));
    }

    #[test]
    fn rejects_non_object_params() {
        let issues = search_schema().validate(&Value::Null).unwrap_err();
        assert!(!issues.is_empty());
    }

    #[test]
    fn invalid_schema_fails_to_compile() {
        assert!(ToolSchema::compile(json!({"type": "not-a-type"})).is_err());
    }
}
