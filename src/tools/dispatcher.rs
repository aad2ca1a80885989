use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::registry::ToolRegistry;
use crate::types::{InvocationRequest, InvocationResult};

/// Resolves a tool by name, validates parameters against its schema and runs
/// its handler.
///
/// Dispatch never fails: unknown tools, schema violations and handler errors
/// (panics included) all come back as an [`InvocationResult`]. Each handler
/// runs on its own tokio task, so a slow tool never holds up other calls.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub async fn dispatch(&self, name: &str, params: &Value) -> InvocationResult {
        let Some(tool) = self.registry.lookup(name) else {
            info!(tool = name, "unknown tool requested");
            return InvocationResult::NotFound {
                tool: name.to_string(),
            };
        };

        if let Err(errors) = tool.schema.validate(params) {
            info!(tool = name, issues = errors.len(), "parameters failed validation");
            debug!(tool = name, ?errors, "validation issues");
            return InvocationResult::ValidationFailure { errors };
        }

        let handler = Arc::clone(&tool.handler);
        let params = params.clone();
        let task = tokio::spawn(async move { handler.call(&params).await });

        match task.await {
            Ok(Ok(value)) => {
                debug!(tool = name, "tool succeeded");
                InvocationResult::Success { value }
            }
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "tool failed");
                InvocationResult::HandlerFailure {
                    message: e.to_string(),
                }
            }
            Err(e) => {
                let message = if e.is_panic() {
                    format!("tool panicked: {}", panic_message(e.into_panic()))
                } else {
                    "tool task was cancelled".to_string()
                };
                warn!(tool = name, %message, "tool task aborted");
                InvocationResult::HandlerFailure { message }
            }
        }
    }

    /// Dispatch a request decoded by a transport.
    pub async fn handle(&self, request: &InvocationRequest) -> InvocationResult {
        self.dispatch(&request.tool, &request.params).await
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
