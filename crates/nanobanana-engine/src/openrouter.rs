use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use nanobanana_contracts::mime::DEFAULT_MIME;
use nanobanana_contracts::providers::ProviderKind;
use nanobanana_contracts::{
    GenerateError, GenerationRequest, GenerationResult, ProviderCredentials, ReferenceImage,
    Result,
};
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    decode_image_base64, ensure_credentials, http_client, read_response, send_error,
    truncate_text, ImageConfig, ImageProvider, ProviderSettings, ERROR_BODY_MAX_CHARS,
};

const KIND: ProviderKind = ProviderKind::OpenRouter;

/// OpenRouter chat-completions adapter. Images travel as `data:` URLs both ways.
pub struct OpenRouterProvider {
    endpoint: String,
    model: String,
    timeout: Duration,
    http: HttpClient,
}

impl OpenRouterProvider {
    pub fn new(settings: &ProviderSettings, model: &str) -> Result<Self> {
        Ok(Self {
            endpoint: format!(
                "{}/chat/completions",
                settings.openrouter_api_base.trim_end_matches('/')
            ),
            model: model.trim().to_string(),
            timeout: settings.timeout,
            http: http_client(KIND, settings.timeout)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ImageProvider for OpenRouterProvider {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    fn generate(
        &self,
        request: &GenerationRequest,
        credentials: &ProviderCredentials,
    ) -> Result<GenerationResult> {
        ensure_credentials(KIND, credentials)?;
        let payload = {
            let images = request.load_reference_images()?;
            build_payload(&self.model, request, &images)
        };

        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            references = request.reference_images.len(),
            "sending OpenRouter request"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(credentials.api_key())
            .json(&payload)
            .send()
            .map_err(|err| send_error(KIND, self.timeout, err))?;
        let (status, body) = read_response(KIND, response)?;
        interpret_response(status, &body)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    modalities: [&'static str; 2],
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    ImageUrl { image_url: ImageUrl },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

fn data_url(image: &ReferenceImage) -> String {
    format!("data:{};base64,{}", image.mime_type, BASE64.encode(&image.bytes))
}

/// One user message: image blocks in order, then the prompt.
fn build_payload<'a>(
    model: &'a str,
    request: &'a GenerationRequest,
    images: &[ReferenceImage],
) -> ChatRequest<'a> {
    let mut content = images
        .iter()
        .map(|image| ContentBlock::ImageUrl {
            image_url: ImageUrl {
                url: data_url(image),
            },
        })
        .collect::<Vec<_>>();
    content.push(ContentBlock::Text {
        text: &request.prompt,
    });

    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content,
        }],
        modalities: ["image", "text"],
        image_config: ImageConfig::from_request(request),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
    error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceMessage {
    images: Option<Vec<ChoiceImage>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceImage {
    image_url: Option<ChoiceImageUrl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceImageUrl {
    url: Option<String>,
}

/// Check order: HTTP status (before any JSON parsing), then error object,
/// then choices, then images, then the data URL itself.
fn interpret_response(status: StatusCode, body: &str) -> Result<GenerationResult> {
    if status != StatusCode::OK {
        return Err(GenerateError::transport(
            KIND,
            Some(status.as_u16()),
            format!(
                "HTTP error: {status} - {}",
                truncate_text(body, ERROR_BODY_MAX_CHARS)
            ),
        ));
    }

    let parsed = serde_json::from_str::<ChatResponse>(body)
        .map_err(|err| GenerateError::malformed(KIND, format!("failed to parse response: {err}")))?;

    if let Some((code, message)) = parsed.error.as_ref().and_then(api_error) {
        return Err(GenerateError::RemoteApi {
            provider: KIND,
            code,
            message,
        });
    }

    let Some(choice) = parsed.choices.unwrap_or_default().into_iter().next() else {
        return Err(GenerateError::EmptyOutput {
            provider: KIND,
            reason: "no choices in response",
        });
    };

    let Some(image) = choice
        .message
        .and_then(|message| message.images)
        .unwrap_or_default()
        .into_iter()
        .next()
    else {
        return Err(GenerateError::EmptyOutput {
            provider: KIND,
            reason: "no images in response",
        });
    };

    let url = image
        .image_url
        .and_then(|image_url| image_url.url)
        .unwrap_or_default();
    decode_data_url(&url)
}

/// Null, `false`, empty strings and empty objects do not count as errors.
fn api_error(error: &Value) -> Option<(Option<i64>, String)> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.is_empty() => None,
        Value::String(message) => Some((None, message.clone())),
        Value::Object(fields) if fields.is_empty() => None,
        Value::Object(fields) => {
            let code = fields.get("code").and_then(Value::as_i64);
            let message = fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            Some((code, message))
        }
        other => Some((None, other.to_string())),
    }
}

/// Splits `data:<mime>;base64,<payload>` at the first comma.
fn decode_data_url(url: &str) -> Result<GenerationResult> {
    if !url.starts_with("data:") {
        return Err(GenerateError::malformed(
            KIND,
            format!("unexpected image URL format: {}", truncate_text(url, 50)),
        ));
    }
    let Some((header, payload)) = url.split_once(',') else {
        return Err(GenerateError::malformed(KIND, "invalid data URL format"));
    };
    let mime_type = header
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .unwrap_or(DEFAULT_MIME)
        .to_string();
    let bytes = decode_image_base64(KIND, payload)?;
    Ok(GenerationResult { bytes, mime_type })
}
