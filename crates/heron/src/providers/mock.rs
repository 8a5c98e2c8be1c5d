use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::base::{Completion, Provider, ToolChoice};
use crate::models::message::Message;
use crate::models::tool::Tool;

enum Script {
    /// Play each completion once, then an empty natural stop
    Sequence(Mutex<Vec<Completion>>),
    /// Play the same completion on every call
    Repeating(Completion),
    /// Fail every call
    Failing(String),
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Script a sequence of messages; stop reasons are inferred from content
    /// (tool requests present means the model is waiting on tools).
    pub fn new(responses: Vec<Message>) -> Self {
        Self::with_completions(responses.into_iter().map(Completion::from_message).collect())
    }

    /// Script a sequence of full completions, for tests that need explicit
    /// stop reasons or usage.
    pub fn with_completions(responses: Vec<Completion>) -> Self {
        Self {
            script: Script::Sequence(Mutex::new(responses)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return the same message on every call, for ceiling tests.
    pub fn repeating(response: Message) -> Self {
        Self {
            script: Script::Repeating(Completion::from_message(response)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every call with the given error message.
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            script: Script::Failing(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times complete() has been called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A handle that stays valid after the provider is boxed
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[Tool],
        _tool_choice: &ToolChoice,
    ) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Sequence(responses) => {
                let mut responses = responses.lock().unwrap();
                if responses.is_empty() {
                    // Out of scripted responses: act like a natural stop
                    Ok(Completion::from_message(Message::assistant().with_text("")))
                } else {
                    Ok(responses.remove(0))
                }
            }
            Script::Repeating(completion) => Ok(completion.clone()),
            Script::Failing(message) => Err(anyhow!("{}", message)),
        }
    }
}
