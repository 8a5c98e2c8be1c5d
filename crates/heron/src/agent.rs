use futures::future;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::errors::LoopError;
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::providers::base::{Provider, StopReason, ToolChoice, Usage};
use crate::registry::ToolRegistry;

/// Iteration ceiling applied when the caller does not pick one
pub const DEFAULT_MAX_STEPS: u32 = 10;

/// The rule deciding when a run stops successfully
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// Stop when the service signals natural completion with no further
    /// tool requests
    NaturalStop,
    /// Stop as soon as the named tool is requested; its arguments become
    /// the answer. A natural stop still ends the run, so a model that
    /// answers in plain text cannot spin the loop to the ceiling.
    OnTool(String),
}

/// The final payload of a successful run
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Text of the closing assistant turn
    Text(String),
    /// Arguments of the terminating tool call
    Structured(Value),
}

/// How a run ended. Reaching the ceiling is a normal termination, not a
/// fault; only Aborted carries an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    AnswerProduced,
    CeilingReached,
    Aborted(LoopError),
}

/// Everything a finished run reports back to the caller
#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub answer: Option<Answer>,
    /// Iterations performed, counting the one that terminated the run
    pub steps: u32,
    /// Full transcript: the initial conversation plus every assistant turn
    /// and tool-response turn appended during the run
    pub messages: Vec<Message>,
    /// Token usage aggregated across all remote calls in the run
    pub usage: Usage,
}

impl RunOutcome {
    fn aborted(error: LoopError, steps: u32, messages: Vec<Message>, usage: Usage) -> Self {
        RunOutcome {
            status: RunStatus::Aborted(error),
            answer: None,
            steps,
            messages,
            usage,
        }
    }
}

/// Agent drives a conversation with a completion provider, executing
/// requested tool calls locally until a termination condition is met or the
/// iteration ceiling is reached.
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    system: String,
    termination: Termination,
    tool_choice: ToolChoice,
    max_steps: u32,
}

impl Agent {
    /// Create a new Agent with the specified provider and tool registry
    pub fn new(provider: Box<dyn Provider>, registry: ToolRegistry) -> Self {
        Self {
            provider,
            registry,
            system: String::new(),
            termination: Termination::NaturalStop,
            tool_choice: ToolChoice::Auto,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_system<S: Into<String>>(mut self, system: S) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Run the loop to completion. Failures never propagate: every error is
    /// logged with its iteration context and folded into the returned
    /// status, so the caller can decide what to do next.
    #[tracing::instrument(
        name = "agent.run",
        skip(self, initial),
        fields(max_steps = self.max_steps, termination = ?self.termination)
    )]
    pub async fn run(&self, initial: &[Message]) -> RunOutcome {
        let mut messages = initial.to_vec();
        let tools = self.registry.schemas();
        let mut usage = Usage::default();
        let mut steps = 0;

        for step in 1..=self.max_steps {
            steps = step;

            let completion = match self
                .provider
                .complete(&self.system, &messages, tools, &self.tool_choice)
                .await
            {
                Ok(completion) => completion,
                Err(e) => {
                    error!(step, error = %e, "remote completion failed");
                    return RunOutcome::aborted(
                        LoopError::RemoteCall {
                            step,
                            message: e.to_string(),
                        },
                        steps,
                        messages,
                        usage,
                    );
                }
            };
            usage.add(&completion.usage);

            let response = completion.message;
            let text = response.text();

            // Pull the requested calls out as owned values; note the first
            // request the adapter could not interpret, if any.
            let mut calls: Vec<(String, ToolCall)> = Vec::new();
            let mut malformed = None;
            for request in response.tool_requests() {
                match &request.call {
                    Ok(call) => calls.push((request.id.clone(), call.clone())),
                    Err(e) => {
                        malformed = Some((request.id.clone(), e.to_string()));
                        break;
                    }
                }
            }

            // The assistant turn always joins the transcript
            messages.push(response);

            if let Some((id, message)) = malformed {
                warn!(step, id = %id, error = %message, "uninterpretable tool request");
                return RunOutcome::aborted(
                    LoopError::SchemaParse { step, id, message },
                    steps,
                    messages,
                    usage,
                );
            }

            // Named-tool termination: the final tool's arguments are the
            // answer; calls after it in the same turn are not executed.
            if let Termination::OnTool(final_tool) = &self.termination {
                if let Some((_, call)) = calls.iter().find(|(_, call)| &call.name == final_tool) {
                    info!(step, tool = %final_tool, "final tool requested");
                    return RunOutcome {
                        status: RunStatus::AnswerProduced,
                        answer: Some(Answer::Structured(call.arguments.clone())),
                        steps,
                        messages,
                        usage,
                    };
                }
            }

            if calls.is_empty() {
                match completion.stop_reason {
                    StopReason::EndTurn => {
                        info!(step, "natural completion");
                        return RunOutcome {
                            status: RunStatus::AnswerProduced,
                            answer: Some(Answer::Text(text)),
                            steps,
                            messages,
                            usage,
                        };
                    }
                    stop_reason => {
                        // No tool calls and no stop signal: break rather
                        // than spin on an identical request.
                        warn!(step, ?stop_reason, "model stalled");
                        return RunOutcome::aborted(
                            LoopError::Stalled { step, stop_reason },
                            steps,
                            messages,
                            usage,
                        );
                    }
                }
            }

            // Validate every requested name before running anything, so an
            // unknown tool aborts the turn with no results appended.
            if let Some((_, unknown)) = calls
                .iter()
                .find(|(_, call)| !self.registry.contains(&call.name))
            {
                warn!(step, tool = %unknown.name, "unknown tool requested");
                return RunOutcome::aborted(
                    LoopError::UnknownTool {
                        step,
                        tool: unknown.name.clone(),
                    },
                    steps,
                    messages,
                    usage,
                );
            }

            // Dispatch concurrently, then zip the outputs back in request
            // order so the appended turn is deterministic and replayable.
            let futures: Vec<_> = calls
                .iter()
                .map(|(_, call)| self.registry.dispatch(call))
                .collect();
            let outputs = future::join_all(futures).await;

            let mut tool_turn = Message::user();
            for ((id, call), output) in calls.iter().zip(outputs.into_iter()) {
                match output {
                    Ok(payload) => {
                        debug!(step, tool = %call.name, "tool call succeeded");
                        tool_turn = tool_turn.with_tool_response(id.clone(), Ok(payload));
                    }
                    Err(e) => {
                        error!(step, tool = %call.name, error = %e, "tool execution failed");
                        return RunOutcome::aborted(
                            LoopError::ToolExecution {
                                step,
                                tool: call.name.clone(),
                                message: e.to_string(),
                            },
                            steps,
                            messages,
                            usage,
                        );
                    }
                }
            }
            messages.push(tool_turn);
        }

        info!(steps, "iteration ceiling reached");
        RunOutcome {
            status: RunStatus::CeilingReached,
            answer: None,
            steps,
            messages,
            usage,
        }
    }
}
