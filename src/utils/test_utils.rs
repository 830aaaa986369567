use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::core::completion::{
    CompletionClient, CompletionError, CompletionRequest, RawCompletionOutput,
};
use crate::tools::{Tool, ToolError};

pub fn function_call(call_id: &str, name: &str, arguments: &str) -> RawCompletionOutput {
    RawCompletionOutput::FunctionCall {
        call_id: call_id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

#[derive(Debug, Clone)]
struct ObservedRequest {
    input: String,
    history_len: usize,
    tool_results: Vec<String>,
}

/// Read side of a [`ScriptedCompletionClient`], usable after the client has
/// been moved into a dispatch loop.
#[derive(Clone, Default)]
pub struct CompletionObserver {
    requests: Arc<Mutex<Vec<ObservedRequest>>>,
}

impl CompletionObserver {
    pub fn inputs(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.input.clone())
            .collect()
    }

    pub fn step_counts(&self) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.tool_results.len())
            .collect()
    }

    pub fn history_lens(&self) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.history_len)
            .collect()
    }

    pub fn last_tool_results(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.tool_results.clone())
            .unwrap_or_default()
    }
}

/// Completion client that replays a fixed script of outputs. Running past
/// the end of the script yields [`CompletionError::EmptyResponse`].
pub struct ScriptedCompletionClient {
    script: Mutex<VecDeque<Result<RawCompletionOutput, CompletionError>>>,
    observer: CompletionObserver,
}

impl ScriptedCompletionClient {
    pub fn new(script: Vec<Result<RawCompletionOutput, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            observer: CompletionObserver::default(),
        }
    }

    pub fn observer(&self) -> CompletionObserver {
        self.observer.clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<RawCompletionOutput, CompletionError> {
        self.observer
            .requests
            .lock()
            .unwrap()
            .push(ObservedRequest {
                input: request.input.to_string(),
                history_len: request.history.len(),
                tool_results: request.steps.iter().map(|s| s.result.clone()).collect(),
            });

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CompletionError::EmptyResponse))
    }
}

/// Tool double that records every argument object it receives.
pub struct RecordingTool {
    name: String,
    outcome: Result<String, String>,
    calls: Mutex<Vec<Map<String, Value>>>,
}

impl RecordingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Ok("ok".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(mut self, result: &str) -> Self {
        self.outcome = Ok(result.to_string());
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.outcome = Err(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Map<String, Value>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Test tool"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"prompt": {"type": "string"}}
        })
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(arguments.clone());
        self.outcome.clone().map_err(|message| ToolError::Api {
            status: 500,
            message,
        })
    }
}
