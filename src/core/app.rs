//! Wires configuration and credentials into a ready-to-run [`Session`].

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tracing::debug;

use crate::core::completion::OpenAiCompletionClient;
use crate::core::config::data::Config;
use crate::core::dispatch::DispatchLoop;
use crate::core::providers::ProviderSession;
use crate::core::session::Session;
use crate::tools::image::ImageGenerationTool;
use crate::tools::{RegistryError, ToolRegistry};
use crate::utils::logging::TranscriptLog;

pub struct AppInitConfig {
    pub model: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// `--model` wins over the configured default.
pub fn resolve_model(model_override: Option<&str>, config: &Config) -> String {
    model_override
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or_else(|| config.model())
        .to_string()
}

pub fn build_registry(
    client: &Client,
    provider: &ProviderSession,
    config: &Config,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ImageGenerationTool::new(
        client.clone(),
        provider.base_url.clone(),
        provider.api_key.clone(),
        config.image_model(),
        config.image_size(),
    )))?;
    Ok(registry)
}

pub fn build_dispatcher(
    client: Client,
    provider: &ProviderSession,
    config: &Config,
    model_override: Option<&str>,
) -> Result<DispatchLoop, RegistryError> {
    let registry = build_registry(&client, provider, config)?;
    let model = resolve_model(model_override, config);
    debug!(%model, tools = ?registry.names(), "Building dispatcher");

    let completion = OpenAiCompletionClient::new(
        client,
        provider.base_url.clone(),
        provider.api_key.clone(),
        model,
        config.system_prompt(),
        registry.definitions(),
    )
    .with_temperature(Some(config.temperature()));

    Ok(DispatchLoop::new(Box::new(completion), registry)
        .with_max_iterations(config.max_tool_iterations()))
}

pub fn new_session(
    init: AppInitConfig,
    config: &Config,
    provider: &ProviderSession,
) -> Result<Session<DispatchLoop>, Box<dyn Error>> {
    let dispatcher = build_dispatcher(Client::new(), provider, config, init.model.as_deref())?;
    let transcript = TranscriptLog::new(init.log_file)?;
    Ok(Session::new(dispatcher, transcript))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::image::IMAGE_TOOL_NAME;

    fn provider() -> ProviderSession {
        ProviderSession {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:9/v1".to_string(),
        }
    }

    #[test]
    fn model_override_beats_config() {
        let config = Config {
            default_model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_model(Some("gpt-4o-mini"), &config), "gpt-4o-mini");
        assert_eq!(resolve_model(Some("  "), &config), "gpt-4o");
        assert_eq!(resolve_model(None, &config), "gpt-4o");
        assert_eq!(
            resolve_model(None, &Config::default()),
            crate::core::config::data::DEFAULT_MODEL
        );
    }

    #[test]
    fn dispatcher_uses_configured_iterations_and_image_tool() {
        let config = Config {
            max_tool_iterations: Some(3),
            ..Default::default()
        };
        let dispatcher = build_dispatcher(Client::new(), &provider(), &config, None).unwrap();
        assert_eq!(dispatcher.max_iterations(), 3);
        assert_eq!(dispatcher.registry().names(), vec![IMAGE_TOOL_NAME]);
    }

    #[test]
    fn new_session_starts_with_empty_history() {
        let session = new_session(
            AppInitConfig {
                model: None,
                log_file: None,
            },
            &Config::default(),
            &provider(),
        )
        .unwrap();
        assert!(session.history().is_empty());
    }
}
