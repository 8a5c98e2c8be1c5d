use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Accumulate another usage record into this one. Absent counters on
    /// either side leave the sum absent only when both sides are absent.
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens = sum_options(self.input_tokens, other.input_tokens);
        self.output_tokens = sum_options(self.output_tokens, other.output_tokens);
        self.total_tokens = sum_options(self.total_tokens, other.total_tokens);
    }
}

fn sum_options(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Why the completion service stopped generating. Each provider adapter maps
/// its own wire-level signal onto these cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Natural completion; the model is done with its answer
    EndTurn,
    /// The model is waiting on the tool results it requested
    ToolUse,
    /// Generation was cut off by the output token limit
    MaxTokens,
    /// Any provider-specific reason we do not model explicitly
    Other(String),
}

/// How the model may use the tools it is offered
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolChoice {
    /// Let the model decide whether to call a tool
    #[default]
    Auto,
    /// Require the model to call some tool on every turn
    Required,
    /// Force the model to call one specific tool
    Tool(String),
    /// Do not expose tools to the model
    None,
}

/// One completion from the remote service, unified across providers.
#[derive(Debug, Clone)]
pub struct Completion {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl Completion {
    /// Wrap a message, inferring the stop reason from its content: a turn
    /// with tool requests is waiting on tools, anything else is a natural
    /// stop.
    pub fn from_message(message: Message) -> Self {
        let stop_reason = if message.tool_requests().is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        };
        Completion {
            message,
            stop_reason,
            usage: Usage::default(),
        }
    }
}

/// Base trait for completion providers (OpenAI, Anthropic, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant turn for the given conversation,
    /// tool schemas and tool-selection policy.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: &ToolChoice,
    ) -> Result<Completion>;
}
