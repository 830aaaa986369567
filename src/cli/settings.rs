//! `drawbot set` / `drawbot unset` handling.

use std::fmt;

use crate::core::config::data::Config;

/// Errors that can occur when modifying configuration settings.
#[derive(Debug, PartialEq)]
pub enum SettingError {
    /// The provided setting key is not recognized.
    UnknownKey(String),
    /// The value could not be parsed for this key.
    InvalidValue {
        key: &'static str,
        input: String,
        expected: &'static str,
    },
    /// A value is required but none was given.
    MissingValue {
        key: &'static str,
        example: &'static str,
    },
}

impl SettingError {
    /// Print the error message to stderr with appropriate formatting.
    pub fn print(&self) {
        match self {
            SettingError::UnknownKey(key) => {
                eprintln!("❌ Unknown config key: {key}");
                eprintln!("   Known keys: {}", SettingKey::ALL_NAMES.join(", "));
            }
            SettingError::InvalidValue {
                key,
                input,
                expected,
            } => {
                eprintln!("❌ Invalid value for {key}: {input}");
                eprintln!("   Expected {expected}");
            }
            SettingError::MissingValue { key, example } => {
                eprintln!("⚠️  Specify a value for {key}");
                eprintln!("Example: {example}");
            }
        }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::InvalidValue {
                key,
                input,
                expected,
            } => write!(f, "Invalid value for {key}: {input} (expected {expected})"),
            SettingError::MissingValue { key, .. } => write!(f, "Missing value for {key}"),
        }
    }
}

impl std::error::Error for SettingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Model,
    BaseUrl,
    Temperature,
    MaxToolIterations,
    ImageModel,
    ImageSize,
    SystemPrompt,
}

impl SettingKey {
    pub const ALL_NAMES: [&'static str; 7] = [
        "model",
        "base-url",
        "temperature",
        "max-tool-iterations",
        "image-model",
        "image-size",
        "system-prompt",
    ];

    pub fn parse(key: &str) -> Result<Self, SettingError> {
        match key {
            "model" | "default-model" => Ok(SettingKey::Model),
            "base-url" => Ok(SettingKey::BaseUrl),
            "temperature" => Ok(SettingKey::Temperature),
            "max-tool-iterations" => Ok(SettingKey::MaxToolIterations),
            "image-model" => Ok(SettingKey::ImageModel),
            "image-size" => Ok(SettingKey::ImageSize),
            "system-prompt" => Ok(SettingKey::SystemPrompt),
            other => Err(SettingError::UnknownKey(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::Model => "model",
            SettingKey::BaseUrl => "base-url",
            SettingKey::Temperature => "temperature",
            SettingKey::MaxToolIterations => "max-tool-iterations",
            SettingKey::ImageModel => "image-model",
            SettingKey::ImageSize => "image-size",
            SettingKey::SystemPrompt => "system-prompt",
        }
    }

    fn example(self) -> &'static str {
        match self {
            SettingKey::Model => "drawbot set model gpt-4o-mini",
            SettingKey::BaseUrl => "drawbot set base-url https://api.openai.com/v1",
            SettingKey::Temperature => "drawbot set temperature 0.2",
            SettingKey::MaxToolIterations => "drawbot set max-tool-iterations 6",
            SettingKey::ImageModel => "drawbot set image-model dall-e-3",
            SettingKey::ImageSize => "drawbot set image-size 1024x1024",
            SettingKey::SystemPrompt => "drawbot set system-prompt You are a pirate artist.",
        }
    }
}

/// Apply `set <key> <value...>`; multi-word values are joined with spaces.
/// Returns the confirmation line to show the user.
pub fn apply_set(config: &mut Config, key: &str, value: &[String]) -> Result<String, SettingError> {
    let key = SettingKey::parse(key)?;
    let value = value.join(" ");
    let value = value.trim();
    if value.is_empty() {
        return Err(SettingError::MissingValue {
            key: key.name(),
            example: key.example(),
        });
    }

    match key {
        SettingKey::Model => config.default_model = Some(value.to_string()),
        SettingKey::BaseUrl => {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(SettingError::InvalidValue {
                    key: key.name(),
                    input: value.to_string(),
                    expected: "an http(s) URL",
                });
            }
            config.base_url = Some(value.to_string());
        }
        SettingKey::Temperature => {
            let temperature = value
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or_else(|| SettingError::InvalidValue {
                    key: key.name(),
                    input: value.to_string(),
                    expected: "a number between 0 and 2",
                })?;
            config.temperature = Some(temperature);
        }
        SettingKey::MaxToolIterations => {
            let iterations = value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| SettingError::InvalidValue {
                    key: key.name(),
                    input: value.to_string(),
                    expected: "a positive whole number",
                })?;
            config.max_tool_iterations = Some(iterations);
        }
        SettingKey::ImageModel => config.image_model = Some(value.to_string()),
        SettingKey::ImageSize => config.image_size = Some(value.to_string()),
        SettingKey::SystemPrompt => config.system_prompt = Some(value.to_string()),
    }

    Ok(format!("✅ Set {} to: {}", key.name(), value))
}

pub fn apply_unset(config: &mut Config, key: &str) -> Result<String, SettingError> {
    let key = SettingKey::parse(key)?;
    match key {
        SettingKey::Model => config.default_model = None,
        SettingKey::BaseUrl => config.base_url = None,
        SettingKey::Temperature => config.temperature = None,
        SettingKey::MaxToolIterations => config.max_tool_iterations = None,
        SettingKey::ImageModel => config.image_model = None,
        SettingKey::ImageSize => config.image_size = None,
        SettingKey::SystemPrompt => config.system_prompt = None,
    }
    Ok(format!("✅ Unset {}", key.name()))
}
