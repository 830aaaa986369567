//! One request/response exchange with the chat completion service.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{
    endpoint_url, ChatCompletionResponse, ChatMessage, ChatRequest, ChatToolCall,
    ChatToolCallFunction, ChatToolDefinition, ROLE_SYSTEM, ROLE_USER,
};
use crate::core::classifier::ToolInvocationRequest;
use crate::core::message::ConversationHistory;

/// Unclassified output of one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCompletionOutput {
    Text(String),
    FunctionCall {
        call_id: String,
        name: String,
        /// Serialized JSON argument object, exactly as the model produced it.
        arguments: String,
    },
}

/// A tool call made earlier in the current turn together with its result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolStep {
    pub request: ToolInvocationRequest,
    pub result: String,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub history: &'a ConversationHistory,
    pub input: &'a str,
    pub steps: &'a [ToolStep],
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<RawCompletionOutput, CompletionError>;
}

#[derive(Debug)]
pub enum CompletionError {
    Request(reqwest::Error),
    Api { status: u16, message: String },
    Decode(serde_json::Error),
    /// The service answered without any choices.
    EmptyResponse,
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Request(err) => write!(f, "Completion request failed: {err}"),
            CompletionError::Api { status, message } => {
                write!(f, "API error (status {status}): {message}")
            }
            CompletionError::Decode(err) => write!(f, "Unreadable completion response: {err}"),
            CompletionError::EmptyResponse => write!(f, "Completion response had no choices"),
        }
    }
}

impl Error for CompletionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CompletionError::Request(err) => Some(err),
            CompletionError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Request(err)
    }
}

pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    system_prompt: String,
    tools: Vec<ChatToolDefinition>,
}

impl OpenAiCompletionClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: Vec<ChatToolDefinition>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            system_prompt: system_prompt.into(),
            tools,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request(&self, request: CompletionRequest<'_>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: build_messages(&self.system_prompt, request),
            stream: false,
            temperature: self.temperature,
            tools: (!self.tools.is_empty()).then(|| self.tools.clone()),
            parallel_tool_calls: (!self.tools.is_empty()).then_some(false),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<RawCompletionOutput, CompletionError> {
        let body = self.build_request(request);
        debug!(
            model = %self.model,
            messages = body.messages.len(),
            steps = request.steps.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(endpoint_url(&self.base_url, "chat/completions"))
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: summarize_api_error(&text),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(CompletionError::Decode)?;
        raw_output_from_response(parsed)
    }
}

/// Lay out the prompt: system instruction, prior turns, the new user message,
/// then each tool step of the current turn as a call/result message pair.
pub fn build_messages(system_prompt: &str, request: CompletionRequest<'_>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2 + request.history.len() + request.steps.len() * 2);
    messages.push(ChatMessage::new(ROLE_SYSTEM, system_prompt));

    for turn in request.history.turns() {
        messages.push(ChatMessage::new(turn.role().as_str(), turn.content()));
    }

    messages.push(ChatMessage::new(ROLE_USER, request.input));

    for step in request.steps {
        let arguments = serde_json::Value::Object(step.request.arguments.clone()).to_string();
        messages.push(ChatMessage::assistant_tool_call(ChatToolCall {
            id: step.request.call_id.clone(),
            kind: "function".to_string(),
            function: ChatToolCallFunction {
                name: step.request.tool_name.clone(),
                arguments,
            },
        }));
        messages.push(ChatMessage::tool_result(
            step.request.call_id.clone(),
            step.result.clone(),
        ));
    }

    messages
}

pub fn raw_output_from_response(
    response: ChatCompletionResponse,
) -> Result<RawCompletionOutput, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(CompletionError::EmptyResponse)?;
    let message = choice.message;

    if let Some(mut calls) = message.tool_calls.filter(|calls| !calls.is_empty()) {
        if calls.len() > 1 {
            debug!(count = calls.len(), "Model requested several tool calls; using the first");
        }
        let call = calls.swap_remove(0);
        return Ok(RawCompletionOutput::FunctionCall {
            call_id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        });
    }

    Ok(RawCompletionOutput::Text(message.content.unwrap_or_default()))
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))?;

    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(collapsed).filter(|text| !text.is_empty())
}

/// Reduce an error body from the service to one readable line.
pub fn summarize_api_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            return summary;
        }
        return value.to_string();
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
