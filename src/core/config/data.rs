use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::dispatch::DEFAULT_MAX_ITERATIONS;
use crate::core::prompt::SYSTEM_MESSAGE;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Chat model used when `--model` is not given
    pub default_model: Option<String>,
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    /// Upper bound on completion calls while the model keeps requesting tools
    pub max_tool_iterations: Option<usize>,
    pub image_model: Option<String>,
    /// Size string passed through to the image service, e.g. `1024x1024`
    pub image_size: Option<String>,
    /// Replaces the built-in system instruction
    pub system_prompt: Option<String>,
}

impl Config {
    pub fn model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }

    pub fn image_model(&self) -> &str {
        self.image_model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL)
    }

    pub fn image_size(&self) -> &str {
        self.image_size.as_deref().unwrap_or(DEFAULT_IMAGE_SIZE)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
            .unwrap_or(SYSTEM_MESSAGE)
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
