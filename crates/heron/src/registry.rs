use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::{Tool, ToolCall};

/// A locally registered callable the model can invoke. Handlers take the
/// argument payload and return a serialized result; they should be safe to
/// call more than once across repeated script runs.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> ToolResult<String>;
}

/// Plain functions and closures work as handlers directly.
#[async_trait]
impl<F> ToolHandler for F
where
    F: Fn(Value) -> ToolResult<String> + Send + Sync,
{
    async fn call(&self, arguments: Value) -> ToolResult<String> {
        (self)(arguments)
    }
}

/// Mapping from tool name to schema and handler. Read-only during a loop
/// run; schemas keep registration order so the advertised tool list is
/// stable across requests.
#[derive(Default)]
pub struct ToolRegistry {
    schemas: Vec<Tool>,
    handlers: HashMap<String, Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool schema with its handler. Names must be unique.
    pub fn register<H>(&mut self, tool: Tool, handler: H) -> Result<()>
    where
        H: ToolHandler + 'static,
    {
        if self.handlers.contains_key(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }
        self.handlers.insert(tool.name.clone(), Box::new(handler));
        self.schemas.push(tool);
        Ok(())
    }

    /// The static tool schema list sent with every request
    pub fn schemas(&self) -> &[Tool] {
        &self.schemas
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Look up the tool by name and invoke it with the argument payload
    #[tracing::instrument(skip(self, call), fields(tool = %call.name))]
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult<String> {
        let handler = self
            .handlers
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        handler.call(call.arguments.clone()).await
    }
}
