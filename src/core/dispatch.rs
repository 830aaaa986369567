//! Alternates completion calls and tool executions until the model produces a
//! final answer.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::classifier::{classify, Classification, ClassifyError, TerminalResponse};
use crate::core::completion::{CompletionClient, CompletionError, CompletionRequest, ToolStep};
use crate::core::message::ConversationHistory;
use crate::tools::{ToolError, ToolRegistry};

/// Completion calls allowed per dispatch before giving up.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

#[derive(Debug)]
pub enum DispatchError {
    Completion(CompletionError),
    Classify(ClassifyError),
    Tool(ToolError),
    IterationLimit { limit: usize },
}

impl DispatchError {
    /// Name of the final-response field the model left out, if that is what
    /// went wrong.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            DispatchError::Classify(ClassifyError::MissingField { field }) => Some(*field),
            _ => None,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Completion(err) => write!(f, "{err}"),
            DispatchError::Classify(err) => write!(f, "{err}"),
            DispatchError::Tool(err) => write!(f, "{err}"),
            DispatchError::IterationLimit { limit } => {
                write!(f, "No final response after {limit} completion calls")
            }
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::Completion(err) => Some(err),
            DispatchError::Classify(err) => Some(err),
            DispatchError::Tool(err) => Some(err),
            DispatchError::IterationLimit { .. } => None,
        }
    }
}

impl From<CompletionError> for DispatchError {
    fn from(err: CompletionError) -> Self {
        DispatchError::Completion(err)
    }
}

impl From<ClassifyError> for DispatchError {
    fn from(err: ClassifyError) -> Self {
        DispatchError::Classify(err)
    }
}

impl From<ToolError> for DispatchError {
    fn from(err: ToolError) -> Self {
        DispatchError::Tool(err)
    }
}

/// Produces one final answer for a user message.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        history: &ConversationHistory,
        input: &str,
    ) -> Result<TerminalResponse, DispatchError>;
}

pub struct DispatchLoop {
    client: Box<dyn CompletionClient>,
    registry: ToolRegistry,
    max_iterations: usize,
}

impl DispatchLoop {
    pub fn new(client: Box<dyn CompletionClient>, registry: ToolRegistry) -> Self {
        Self {
            client,
            registry,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// At least one completion call is always made.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

#[async_trait]
impl Dispatcher for DispatchLoop {
    async fn dispatch(
        &self,
        history: &ConversationHistory,
        input: &str,
    ) -> Result<TerminalResponse, DispatchError> {
        let mut steps: Vec<ToolStep> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let raw = self
                .client
                .complete(CompletionRequest {
                    history,
                    input,
                    steps: &steps,
                })
                .await?;

            match classify(&raw, &self.registry)? {
                Classification::Finish(response) => {
                    debug!(
                        iteration,
                        tool_calls = steps.len(),
                        has_url = response.url.is_some(),
                        "Dispatch finished"
                    );
                    return Ok(response);
                }
                Classification::Invoke(request) => {
                    // The result could never be sent back, so the tool is not run.
                    if iteration == self.max_iterations {
                        warn!(
                            iteration,
                            tool = %request.tool_name,
                            "Tool requested on the last allowed completion call"
                        );
                        break;
                    }
                    info!(iteration, tool = %request.tool_name, "Model requested tool");
                    let result = self.registry.execute(&request).await?;
                    steps.push(ToolStep { request, result });
                }
            }
        }

        Err(DispatchError::IterationLimit {
            limit: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::completion::RawCompletionOutput;
    use crate::utils::test_utils::{function_call, RecordingTool, ScriptedCompletionClient};
    use std::sync::Arc;

    fn dispatch_loop(
        client: ScriptedCompletionClient,
        tool: Arc<RecordingTool>,
    ) -> DispatchLoop {
        let mut registry = ToolRegistry::new();
        registry.register(tool).unwrap();
        DispatchLoop::new(Box::new(client), registry)
    }

    #[tokio::test]
    async fn runs_each_requested_tool_in_order_before_finishing() {
        let client = ScriptedCompletionClient::new(vec![
            Ok(function_call("c1", "generate_image", r#"{"prompt":"one"}"#)),
            Ok(function_call("c2", "generate_image", r#"{"prompt":"two"}"#)),
            Ok(function_call("c3", "generate_image", r#"{"prompt":"three"}"#)),
            Ok(function_call(
                "c4",
                "Response",
                r#"{"chatbot_message":"All three are done","url":"https://img/3.png"}"#,
            )),
        ]);
        let observed = client.observer();
        let tool = Arc::new(RecordingTool::new("generate_image").returning("https://img/x.png"));
        let dispatch = dispatch_loop(client, tool.clone());

        let history = ConversationHistory::new();
        let response = dispatch.dispatch(&history, "draw three").await.unwrap();

        assert_eq!(response.chatbot_message, "All three are done");
        assert_eq!(response.url.as_deref(), Some("https://img/3.png"));

        let prompts: Vec<_> = tool
            .calls()
            .iter()
            .map(|args| args["prompt"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(prompts, ["one", "two", "three"]);

        assert_eq!(observed.step_counts(), [0, 1, 2, 3]);
        assert_eq!(observed.inputs(), ["draw three"; 4]);
    }

    #[tokio::test]
    async fn text_reply_finishes_without_tools() {
        let client = ScriptedCompletionClient::new(vec![Ok(RawCompletionOutput::Text(
            "Just chatting today".to_string(),
        ))]);
        let tool = Arc::new(RecordingTool::new("generate_image"));
        let dispatch = dispatch_loop(client, tool.clone());

        let response = dispatch
            .dispatch(&ConversationHistory::new(), "hello")
            .await
            .unwrap();
        assert_eq!(response, TerminalResponse::text("Just chatting today"));
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn tool_failure_aborts_dispatch() {
        let client = ScriptedCompletionClient::new(vec![
            Ok(function_call("c1", "generate_image", r#"{"prompt":"x"}"#)),
            Ok(RawCompletionOutput::Text("never reached".to_string())),
        ]);
        let observed = client.observer();
        let tool = Arc::new(RecordingTool::new("generate_image").failing("quota exceeded"));
        let dispatch = dispatch_loop(client, tool);

        let err = dispatch
            .dispatch(&ConversationHistory::new(), "draw")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Tool(_)));
        assert_eq!(observed.step_counts().len(), 1);
    }

    #[tokio::test]
    async fn iteration_limit_stops_endless_tool_requests() {
        let script = (0..5)
            .map(|i| {
                Ok(function_call(
                    &format!("c{i}"),
                    "generate_image",
                    r#"{"prompt":"again"}"#,
                ))
            })
            .collect();
        let client = ScriptedCompletionClient::new(script);
        let tool = Arc::new(RecordingTool::new("generate_image"));
        let dispatch = dispatch_loop(client, tool.clone()).with_max_iterations(3);

        let err = dispatch
            .dispatch(&ConversationHistory::new(), "loop")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::IterationLimit { limit: 3 }));
        assert_eq!(tool.calls().len(), 2);
    }

    #[tokio::test]
    async fn tool_is_not_run_on_the_last_allowed_call() {
        let client = ScriptedCompletionClient::new(vec![Ok(function_call(
            "c1",
            "generate_image",
            r#"{"prompt":"a cat"}"#,
        ))]);
        let observed = client.observer();
        let tool = Arc::new(RecordingTool::new("generate_image"));
        let dispatch = dispatch_loop(client, tool.clone()).with_max_iterations(1);

        let err = dispatch
            .dispatch(&ConversationHistory::new(), "draw a cat")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::IterationLimit { limit: 1 }));
        assert!(tool.calls().is_empty());
        assert_eq!(observed.inputs().len(), 1);
    }

    #[tokio::test]
    async fn completion_errors_propagate() {
        let client = ScriptedCompletionClient::new(vec![Err(CompletionError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })]);
        let dispatch = dispatch_loop(client, Arc::new(RecordingTool::new("generate_image")));

        let err = dispatch
            .dispatch(&ConversationHistory::new(), "hi")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error (status 503): overloaded");
        assert_eq!(err.missing_field(), None);
    }

    #[tokio::test]
    async fn missing_message_field_is_identifiable() {
        let client = ScriptedCompletionClient::new(vec![Ok(function_call(
            "c1",
            "Response",
            r#"{"url":"https://img/1.png"}"#,
        ))]);
        let dispatch = dispatch_loop(client, Arc::new(RecordingTool::new("generate_image")));

        let err = dispatch
            .dispatch(&ConversationHistory::new(), "hi")
            .await
            .unwrap_err();
        assert_eq!(err.missing_field(), Some("chatbot_message"));
    }

    #[test]
    fn zero_iterations_is_clamped() {
        let dispatch = DispatchLoop::new(
            Box::new(ScriptedCompletionClient::new(Vec::new())),
            ToolRegistry::new(),
        )
        .with_max_iterations(0);
        assert_eq!(dispatch.max_iterations(), 1);
    }
}
