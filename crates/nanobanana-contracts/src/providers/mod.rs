mod selector;

use std::fmt;

pub use selector::{select_provider, CredentialEnv, DEFAULT_OPENROUTER_MODEL, GEMINI_MODEL};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    OpenRouter,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn credential_env(self) -> &'static str {
        match self {
            ProviderKind::Gemini => GEMINI_API_KEY_ENV,
            ProviderKind::OpenRouter => OPENROUTER_API_KEY_ENV,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => f.write_str("Gemini"),
            ProviderKind::OpenRouter => f.write_str("OpenRouter"),
        }
    }
}

/// An API key bound to the one provider it was read for.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    provider: ProviderKind,
    api_key: String,
}

impl ProviderCredentials {
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderChoice {
    pub provider: ProviderKind,
    pub credentials: ProviderCredentials,
    pub model: String,
}
