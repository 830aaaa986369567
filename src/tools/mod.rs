//! Tools the model may call, plus the reserved `Response` schema it uses to
//! hand back a final answer.

pub mod image;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::api::ChatToolDefinition;
use crate::core::classifier::ToolInvocationRequest;

/// Function name the model calls to deliver its final structured answer.
pub const RESPONSE_TOOL: &str = "Response";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the tool's argument object.
    fn parameters(&self) -> Value;

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<String, ToolError>;
}

#[derive(Debug)]
pub enum ToolError {
    /// No registered tool carries this name.
    Unknown(String),
    /// The arguments did not satisfy the tool's declared schema.
    InvalidArguments {
        tool: String,
        problems: Vec<String>,
    },
    /// The tool's own schema could not be compiled.
    InvalidSchema { tool: String, message: String },
    Request(reqwest::Error),
    Api { status: u16, message: String },
    /// The remote service answered but without a usable result.
    EmptyResult(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::Unknown(name) => write!(f, "Unknown tool: {name}"),
            ToolError::InvalidArguments { tool, problems } => {
                write!(f, "Invalid arguments for {tool}: {}", problems.join("; "))
            }
            ToolError::InvalidSchema { tool, message } => {
                write!(f, "Tool {tool} declares an invalid schema: {message}")
            }
            ToolError::Request(err) => write!(f, "Tool request failed: {err}"),
            ToolError::Api { status, message } => {
                write!(f, "Tool service error (status {status}): {message}")
            }
            ToolError::EmptyResult(detail) => write!(f, "Tool returned no result: {detail}"),
        }
    }
}

impl Error for ToolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ToolError::Request(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Request(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    ReservedName(String),
    Duplicate(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::ReservedName(name) => {
                write!(f, "Tool name '{name}' is reserved for final responses")
            }
            RegistryError::Duplicate(name) => write!(f, "Tool '{name}' is already registered"),
        }
    }
}

impl Error for RegistryError {}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if name == RESPONSE_TOOL {
            return Err(RegistryError::ReservedName(name));
        }
        if self.contains(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Function names are matched exactly, as the model echoes them back.
    pub fn find(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Schemas advertised to the model: every registered tool followed by the
    /// terminal `Response` schema.
    pub fn definitions(&self) -> Vec<ChatToolDefinition> {
        let mut definitions: Vec<_> = self
            .tools
            .iter()
            .map(|tool| {
                ChatToolDefinition::function(tool.name(), tool.description(), tool.parameters())
            })
            .collect();
        definitions.push(response_definition());
        definitions
    }

    pub async fn execute(&self, request: &ToolInvocationRequest) -> Result<String, ToolError> {
        let tool = self
            .find(&request.tool_name)
            .ok_or_else(|| ToolError::Unknown(request.tool_name.clone()))?;

        validate_arguments(tool.as_ref(), &request.arguments)?;

        debug!(tool = %request.tool_name, "Executing tool");
        tool.invoke(&request.arguments).await
    }
}

fn validate_arguments(tool: &dyn Tool, arguments: &Map<String, Value>) -> Result<(), ToolError> {
    let problems = schema_problems(&tool.parameters(), arguments).map_err(|message| {
        ToolError::InvalidSchema {
            tool: tool.name().to_string(),
            message,
        }
    })?;

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments {
            tool: tool.name().to_string(),
            problems,
        })
    }
}

/// Every way `arguments` violates `schema`. `Err` when the schema itself
/// does not compile.
pub fn schema_problems(
    schema: &Value,
    arguments: &Map<String, Value>,
) -> Result<Vec<String>, String> {
    let validator = jsonschema::validator_for(schema).map_err(|err| err.to_string())?;
    let instance = Value::Object(arguments.clone());
    Ok(validator
        .iter_errors(&instance)
        .map(|err| err.to_string())
        .collect())
}

pub fn response_definition() -> ChatToolDefinition {
    ChatToolDefinition::function(
        RESPONSE_TOOL,
        "Final response to the input message",
        response_parameters(),
    )
}

/// Argument schema of the `Response` function.
pub fn response_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "chatbot_message": {
                "type": "string",
                "description": "Your response to the message asked"
            },
            "url": {
                "type": "string",
                "description": "URL returned by the `generate_image` tool, if one was produced"
            }
        },
        "required": ["chatbot_message"]
    })
}
