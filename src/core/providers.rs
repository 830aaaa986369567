use crate::core::config::data::{Config, DEFAULT_BASE_URL};
use std::error::Error;
use std::fmt;
use tracing::debug;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

const QUICK_FIXES: &[&str] = &[
    "drawbot auth                    # Store an API key in the system keyring",
    "export OPENAI_API_KEY=sk-...    # Use environment variable",
];

/// Credentials and endpoint for the completion and image services.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub api_key: String,
    pub base_url: String,
}

impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug)]
pub struct ProviderResolutionError {
    message: String,
    quick_fixes: &'static [&'static str],
    exit_code: i32,
}

impl ProviderResolutionError {
    pub fn missing_authentication() -> Self {
        Self::new(
            format!(
                "❌ No API key found. {API_KEY_ENV} is not set and no key is stored in the keyring.\n\nPlease either:\n1. Run 'drawbot auth' to store a key, or\n2. Set environment variables:\n   export {API_KEY_ENV}=\"your-api-key-here\"\n   export {BASE_URL_ENV}=\"{DEFAULT_BASE_URL}\"  # Optional"
            ),
            QUICK_FIXES,
            2,
        )
    }

    pub fn keyring_unavailable(err: &dyn Error) -> Self {
        Self::new(
            format!("❌ Could not read the API key from the system keyring: {err}"),
            QUICK_FIXES,
            2,
        )
    }

    fn new(
        message: impl Into<String>,
        quick_fixes: &'static [&'static str],
        exit_code: i32,
    ) -> Self {
        Self {
            message: message.into(),
            quick_fixes,
            exit_code,
        }
    }

    pub fn quick_fixes(&self) -> &'static [&'static str] {
        self.quick_fixes
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

impl fmt::Display for ProviderResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ProviderResolutionError {}

/// Somewhere an API key may have been saved earlier.
pub trait CredentialSource {
    fn stored_api_key(&self) -> Result<Option<String>, Box<dyn Error>>;
}

pub fn resolve_session<S: CredentialSource>(
    source: &S,
    config: &Config,
) -> Result<ProviderSession, ProviderResolutionError> {
    resolve_session_with_env(source, config, |name| std::env::var(name).ok())
}

/// Key: environment, then the credential source. Base URL: environment,
/// then config, then the OpenAI default.
pub fn resolve_session_with_env<S, F>(
    source: &S,
    config: &Config,
    env: F,
) -> Result<ProviderSession, ProviderResolutionError>
where
    S: CredentialSource,
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    let api_key = match non_empty(API_KEY_ENV) {
        Some(key) => {
            debug!("Using API key from {API_KEY_ENV}");
            key
        }
        None => match source.stored_api_key() {
            Ok(Some(key)) => {
                debug!("Using API key from keyring");
                key
            }
            Ok(None) => return Err(ProviderResolutionError::missing_authentication()),
            Err(err) => return Err(ProviderResolutionError::keyring_unavailable(err.as_ref())),
        },
    };

    let base_url = non_empty(BASE_URL_ENV)
        .or_else(|| config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    Ok(ProviderSession { api_key, base_url })
}
