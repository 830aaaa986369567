//! `generate_image`: text-to-image through an OpenAI-compatible
//! `images/generations` endpoint.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{Tool, ToolError};
use crate::api::{endpoint_url, ImageGenerationRequest, ImageGenerationResponse};
use crate::core::completion::summarize_api_error;

pub const IMAGE_TOOL_NAME: &str = "generate_image";

#[derive(Clone, Debug)]
pub struct ImageGenerationTool {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    size: String,
}

impl ImageGenerationTool {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            size: size.into(),
        }
    }

    fn build_request(&self, prompt: &str) -> ImageGenerationRequest {
        ImageGenerationRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.size.clone(),
            response_format: "url".to_string(),
        }
    }
}

#[async_trait]
impl Tool for ImageGenerationTool {
    fn name(&self) -> &str {
        IMAGE_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Generate an image from a text description and return a URL to the result"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Detailed description of the image to generate"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        let prompt = arguments
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: IMAGE_TOOL_NAME.to_string(),
                problems: vec!["prompt must be a string".to_string()],
            })?;

        info!(model = %self.model, size = %self.size, "Requesting image generation");

        let response = self
            .client
            .post(endpoint_url(&self.base_url, "images/generations"))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ToolError::Api {
                status: status.as_u16(),
                message: summarize_api_error(&body),
            });
        }

        image_url_from_body(&body)
    }
}

fn image_url_from_body(body: &str) -> Result<String, ToolError> {
    let parsed: ImageGenerationResponse = serde_json::from_str(body)
        .map_err(|err| ToolError::EmptyResult(format!("unreadable response: {err}")))?;

    let image = parsed
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::EmptyResult("no images in response".to_string()))?;

    if let Some(revised) = image.revised_prompt.as_deref() {
        debug!(revised_prompt = revised, "Image service revised the prompt");
    }

    image
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ToolError::EmptyResult("image has no url".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ImageGenerationTool {
        ImageGenerationTool::new(
            reqwest::Client::new(),
            "https://api.example.com/v1",
            "test-key",
            "dall-e-3",
            "1024x1024",
        )
    }

    #[test]
    fn request_asks_for_a_single_url() {
        let request = serde_json::to_value(tool().build_request("a cat")).unwrap();
        assert_eq!(request["model"], "dall-e-3");
        assert_eq!(request["prompt"], "a cat");
        assert_eq!(request["n"], 1);
        assert_eq!(request["size"], "1024x1024");
        assert_eq!(request["response_format"], "url");
    }

    #[test]
    fn first_image_url_is_returned() {
        let body = r#"{"created": 1, "data": [
            {"url": "https://img/cat.png", "revised_prompt": "a fluffy cat"},
            {"url": "https://img/other.png"}
        ]}"#;
        assert_eq!(image_url_from_body(body).unwrap(), "https://img/cat.png");
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(matches!(
            image_url_from_body(r#"{"data": []}"#),
            Err(ToolError::EmptyResult(_))
        ));
        assert!(matches!(
            image_url_from_body(r#"{"data": [{"b64_json": "abc"}]}"#),
            Err(ToolError::EmptyResult(_))
        ));
    }

    #[test]
    fn schema_requires_prompt() {
        let schema = tool().parameters();
        assert_eq!(schema["required"], json!(["prompt"]));
    }

    #[tokio::test]
    async fn invoke_rejects_non_string_prompt_without_network() {
        let mut args = Map::new();
        args.insert("prompt".to_string(), json!(7));
        let err = tool().invoke(&args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
