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
use tracing::{debug, warn};

use crate::{
    decode_image_base64, ensure_credentials, http_client, read_response, send_error,
    truncate_text, ImageConfig, ImageProvider, ProviderSettings, ERROR_BODY_MAX_CHARS,
};

const KIND: ProviderKind = ProviderKind::Gemini;

/// Gemini `generateContent` adapter. The key travels in `x-goog-api-key`.
pub struct GeminiProvider {
    endpoint: String,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(settings: &ProviderSettings, model: &str) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint_for_model(&settings.gemini_api_base, model),
            timeout: settings.timeout,
            http: http_client(KIND, settings.timeout)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ImageProvider for GeminiProvider {
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
            build_payload(request, &images)
        };

        debug!(
            endpoint = %self.endpoint,
            references = request.reference_images.len(),
            "sending Gemini request"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", credentials.api_key())
            .json(&payload)
            .send()
            .map_err(|err| send_error(KIND, self.timeout, err))?;
        let (status, body) = read_response(KIND, response)?;
        interpret_response(status, &body)
    }
}

fn endpoint_for_model(api_base: &str, model: &str) -> String {
    let trimmed = model.trim();
    let model_path = if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    };
    format!("{}/{}:generateContent", api_base.trim_end_matches('/'), model_path)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
    image_config: ImageConfig,
}

/// Reference images first, in order, then the prompt.
fn build_payload<'a>(
    request: &'a GenerationRequest,
    images: &[ReferenceImage],
) -> GenerateContentRequest<'a> {
    let mut parts = images
        .iter()
        .map(|image| Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type,
                data: BASE64.encode(&image.bytes),
            }),
        })
        .collect::<Vec<_>>();
    parts.push(Part {
        text: Some(&request.prompt),
        inline_data: None,
    });

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_modalities: ["IMAGE", "TEXT"],
            image_config: ImageConfig::from_request(request),
        },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
    status: Option<String>,
}

/// Check order: embedded error object, then HTTP status, then candidates, then parts.
fn interpret_response(status: StatusCode, body: &str) -> Result<GenerationResult> {
    let parsed = match serde_json::from_str::<GenerateContentResponse>(body) {
        Ok(parsed) => parsed,
        Err(_) if status != StatusCode::OK => {
            return Err(GenerateError::transport(
                KIND,
                Some(status.as_u16()),
                format!(
                    "HTTP error: {status} - {}",
                    truncate_text(body, ERROR_BODY_MAX_CHARS)
                ),
            ))
        }
        Err(err) => {
            return Err(GenerateError::malformed(
                KIND,
                format!("failed to parse response: {err}"),
            ))
        }
    };

    if let Some(error) = parsed.error {
        let message = error
            .message
            .filter(|message| !message.is_empty())
            .or(error.status)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(GenerateError::RemoteApi {
            provider: KIND,
            code: error.code,
            message,
        });
    }

    if status != StatusCode::OK {
        return Err(GenerateError::transport(
            KIND,
            Some(status.as_u16()),
            format!("HTTP error: {status}"),
        ));
    }

    let Some(candidate) = parsed.candidates.unwrap_or_default().into_iter().next() else {
        return Err(GenerateError::EmptyOutput {
            provider: KIND,
            reason: "no candidates in response",
        });
    };

    let parts = candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default();
    let mut text_seen = None;
    for part in parts {
        if let Some(inline) = part.inline_data {
            let data = inline.data.unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            let bytes = decode_image_base64(KIND, &data)?;
            let mime_type = inline
                .mime_type
                .filter(|mime| !mime.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIME.to_string());
            return Ok(GenerationResult { bytes, mime_type });
        }
        if text_seen.is_none() {
            text_seen = part.text.filter(|text| !text.trim().is_empty());
        }
    }

    if let Some(text) = text_seen {
        warn!(text = %truncate_text(&text, 200), "Gemini answered with text only");
    }
    Err(GenerateError::EmptyOutput {
        provider: KIND,
        reason: "no image data in response",
    })
}
