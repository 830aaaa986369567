//! Sorts a raw completion into a final answer or a tool request.
//!
//! The model can answer in three shapes: free text, a call to the reserved
//! `Response` function, or a call to one of the registered tools. Every
//! output maps to exactly one [`Classification`]; anything that fits none of
//! the shapes is a [`ClassifyError`] rather than a guess.

use std::error::Error;
use std::fmt;

use serde_json::{Map, Value};

use crate::core::completion::RawCompletionOutput;
use crate::tools::{response_parameters, schema_problems, ToolRegistry, RESPONSE_TOOL};

pub const CHATBOT_MESSAGE_FIELD: &str = "chatbot_message";
pub const URL_FIELD: &str = "url";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalResponse {
    pub chatbot_message: String,
    pub url: Option<String>,
}

impl TerminalResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            chatbot_message: message.into(),
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Finish(TerminalResponse),
    Invoke(ToolInvocationRequest),
}

#[derive(Debug)]
pub enum ClassifyError {
    MalformedArguments {
        function: String,
        source: serde_json::Error,
    },
    ArgumentsNotObject {
        function: String,
    },
    MissingField {
        field: &'static str,
    },
    UnknownTool {
        name: String,
    },
    /// `Response` arguments that do not match its schema, e.g. a non-string
    /// message.
    InvalidResponse {
        problems: Vec<String>,
    },
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::MalformedArguments { function, source } => {
                write!(f, "Malformed arguments for {function}: {source}")
            }
            ClassifyError::ArgumentsNotObject { function } => {
                write!(f, "Arguments for {function} are not a JSON object")
            }
            ClassifyError::MissingField { field } => {
                write!(f, "Final response is missing '{field}'")
            }
            ClassifyError::UnknownTool { name } => {
                write!(f, "Model requested unknown tool '{name}'")
            }
            ClassifyError::InvalidResponse { problems } => {
                write!(f, "Invalid final response: {}", problems.join("; "))
            }
        }
    }
}

impl Error for ClassifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClassifyError::MalformedArguments { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub fn classify(
    output: &RawCompletionOutput,
    registry: &ToolRegistry,
) -> Result<Classification, ClassifyError> {
    match output {
        RawCompletionOutput::Text(content) => {
            Ok(Classification::Finish(TerminalResponse::text(content.clone())))
        }
        RawCompletionOutput::FunctionCall {
            name, arguments, ..
        } if name == RESPONSE_TOOL => {
            let arguments = parse_arguments(name, arguments)?;
            terminal_from_arguments(&arguments).map(Classification::Finish)
        }
        RawCompletionOutput::FunctionCall {
            call_id,
            name,
            arguments,
        } => {
            if !registry.contains(name) {
                return Err(ClassifyError::UnknownTool { name: name.clone() });
            }
            Ok(Classification::Invoke(ToolInvocationRequest {
                call_id: call_id.clone(),
                tool_name: name.clone(),
                arguments: parse_arguments(name, arguments)?,
            }))
        }
    }
}

fn parse_arguments(function: &str, raw: &str) -> Result<Map<String, Value>, ClassifyError> {
    // Some servers send an empty string for a call with no arguments.
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ClassifyError::ArgumentsNotObject {
            function: function.to_string(),
        }),
        Err(source) => Err(ClassifyError::MalformedArguments {
            function: function.to_string(),
            source,
        }),
    }
}

fn terminal_from_arguments(
    arguments: &Map<String, Value>,
) -> Result<TerminalResponse, ClassifyError> {
    if !arguments.contains_key(CHATBOT_MESSAGE_FIELD) {
        return Err(ClassifyError::MissingField {
            field: CHATBOT_MESSAGE_FIELD,
        });
    }

    // An explicit null url means no image.
    let mut arguments = arguments.clone();
    if arguments.get(URL_FIELD).is_some_and(Value::is_null) {
        arguments.remove(URL_FIELD);
    }

    let problems = schema_problems(&response_parameters(), &arguments)
        .map_err(|message| ClassifyError::InvalidResponse {
            problems: vec![message],
        })?;
    if !problems.is_empty() {
        return Err(ClassifyError::InvalidResponse { problems });
    }

    let chatbot_message = arguments
        .get(CHATBOT_MESSAGE_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let url = arguments
        .get(URL_FIELD)
        .and_then(Value::as_str)
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string);

    Ok(TerminalResponse {
        chatbot_message,
        url,
    })
}
