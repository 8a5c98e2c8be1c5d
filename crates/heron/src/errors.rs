use crate::providers::base::StopReason;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures tied to a single tool invocation. These travel inside message
/// content, so they stay cloneable and serializable.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    Execution(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Why a loop run stopped early. Each variant records the iteration it
/// happened on; reaching the iteration ceiling is a normal termination path
/// and deliberately not part of this enum.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoopError {
    #[error("remote completion failed on step {step}: {message}")]
    RemoteCall { step: u32, message: String },

    #[error("tool '{tool}' failed on step {step}: {message}")]
    ToolExecution {
        step: u32,
        tool: String,
        message: String,
    },

    #[error("model requested unknown tool '{tool}' on step {step}")]
    UnknownTool { step: u32, tool: String },

    #[error("could not interpret tool request {id} on step {step}: {message}")]
    SchemaParse {
        step: u32,
        id: String,
        message: String,
    },

    #[error("model returned neither tool calls nor a stop signal on step {step} ({stop_reason:?})")]
    Stalled { step: u32, stop_reason: StopReason },
}
