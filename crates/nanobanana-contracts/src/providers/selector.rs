use std::env;

use tracing::debug;

use super::{
    ProviderChoice, ProviderCredentials, ProviderKind, GEMINI_API_KEY_ENV, OPENROUTER_API_KEY_ENV,
};
use crate::error::{GenerateError, Result};

pub const GEMINI_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-3-pro-image-preview";

/// Provider keys as found at startup. Empty or whitespace-only values count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialEnv {
    pub gemini: Option<String>,
    pub openrouter: Option<String>,
}

impl CredentialEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            gemini: read(GEMINI_API_KEY_ENV),
            openrouter: read(OPENROUTER_API_KEY_ENV),
        }
    }
}

impl std::fmt::Debug for CredentialEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEnv")
            .field("gemini", &self.gemini.is_some())
            .field("openrouter", &self.openrouter.is_some())
            .finish()
    }
}

/// Picks the backend for this invocation.
///
/// Precedence: explicit model > OpenRouter-only key > Gemini key > failure.
/// A model override always means OpenRouter, even when a Gemini key is set.
pub fn select_provider(creds: &CredentialEnv, model_override: Option<&str>) -> Result<ProviderChoice> {
    let model_override = model_override
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(model) = model_override {
        let Some(key) = creds.openrouter.as_deref() else {
            return Err(GenerateError::MissingCredential {
                variable: OPENROUTER_API_KEY_ENV,
                hint: "required for OpenRouter API",
            });
        };
        debug!(model, "model override selects OpenRouter");
        return Ok(openrouter_choice(key, model));
    }

    match (creds.gemini.as_deref(), creds.openrouter.as_deref()) {
        (None, Some(key)) => {
            debug!("only OpenRouter key present");
            Ok(openrouter_choice(key, DEFAULT_OPENROUTER_MODEL))
        }
        (Some(key), _) => Ok(ProviderChoice {
            provider: ProviderKind::Gemini,
            credentials: ProviderCredentials::new(ProviderKind::Gemini, key),
            model: GEMINI_MODEL.to_string(),
        }),
        (None, None) => Err(GenerateError::MissingCredential {
            variable: GEMINI_API_KEY_ENV,
            hint: "or use OPENROUTER_API_KEY",
        }),
    }
}

fn openrouter_choice(key: &str, model: &str) -> ProviderChoice {
    ProviderChoice {
        provider: ProviderKind::OpenRouter,
        credentials: ProviderCredentials::new(ProviderKind::OpenRouter, key),
        model: model.to_string(),
    }
}
