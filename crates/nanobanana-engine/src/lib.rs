//! Provider adapters: turn a [`GenerationRequest`] into one HTTP call against
//! Gemini or OpenRouter and the response back into a [`GenerationResult`].

mod gemini;
mod openrouter;
#[cfg(test)]
mod test_support;

use std::env;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use nanobanana_contracts::providers::ProviderKind;
use nanobanana_contracts::{
    GenerateError, GenerationRequest, GenerationResult, ProviderChoice, ProviderCredentials, Result,
};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const ERROR_BODY_MAX_CHARS: usize = 512;

/// Endpoints and timeout handed to adapters at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub gemini_api_base: String,
    pub openrouter_api_base: String,
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            openrouter_api_base: DEFAULT_OPENROUTER_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProviderSettings {
    /// Defaults, with `GEMINI_API_BASE` / `OPENROUTER_API_BASE` overrides when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            gemini_api_base: base("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            openrouter_api_base: base("OPENROUTER_API_BASE", DEFAULT_OPENROUTER_API_BASE),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One backend's wire format. Implementations own their own response-check order.
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    fn generate(
        &self,
        request: &GenerationRequest,
        credentials: &ProviderCredentials,
    ) -> Result<GenerationResult>;
}

pub fn provider_for(
    choice: &ProviderChoice,
    settings: &ProviderSettings,
) -> Result<Box<dyn ImageProvider>> {
    Ok(match choice.provider {
        ProviderKind::Gemini => Box::new(GeminiProvider::new(settings, &choice.model)?),
        ProviderKind::OpenRouter => Box::new(OpenRouterProvider::new(settings, &choice.model)?),
    })
}

/// Runs exactly one generation against the chosen provider.
pub fn generate(
    choice: &ProviderChoice,
    request: &GenerationRequest,
    settings: &ProviderSettings,
) -> Result<GenerationResult> {
    let provider = provider_for(choice, settings)?;
    debug!(
        provider = choice.provider.name(),
        model = %choice.model,
        references = request.reference_images.len(),
        "dispatching generation"
    );
    provider.generate(request, &choice.credentials)
}

/// Aspect ratio and size block, identical in both wire formats.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: &'static str,
    image_size: &'static str,
}

impl ImageConfig {
    fn from_request(request: &GenerationRequest) -> Self {
        Self {
            aspect_ratio: request.aspect_ratio.as_str(),
            image_size: request.size.as_str(),
        }
    }
}

fn http_client(provider: ProviderKind, timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| {
            GenerateError::transport(provider, None, format!("failed to build HTTP client: {err}"))
        })
}

fn ensure_credentials(provider: ProviderKind, credentials: &ProviderCredentials) -> Result<()> {
    if credentials.provider() != provider {
        return Err(GenerateError::MissingCredential {
            variable: provider.credential_env(),
            hint: "credentials were issued for another provider",
        });
    }
    Ok(())
}

fn send_error(provider: ProviderKind, timeout: Duration, err: reqwest::Error) -> GenerateError {
    if err.is_timeout() {
        return GenerateError::transport(
            provider,
            None,
            format!("timed out after {}s", timeout.as_secs_f64()),
        );
    }
    GenerateError::transport(provider, err.status().map(|status| status.as_u16()), err.to_string())
}

fn read_response(provider: ProviderKind, response: HttpResponse) -> Result<(StatusCode, String)> {
    let status = response.status();
    let body = response.text().map_err(|err| {
        GenerateError::transport(
            provider,
            Some(status.as_u16()),
            format!("failed to read response: {err}"),
        )
    })?;
    Ok((status, body))
}

fn decode_image_base64(provider: ProviderKind, data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(data.trim().as_bytes())
        .map_err(|err| GenerateError::malformed(provider, format!("failed to decode image data: {err}")))
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
