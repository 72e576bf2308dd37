use std::env;

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Map, Value};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_FALLBACK_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Base64 image plus its mime type, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    OneK,
    TwoK,
    FourK,
}

impl ResolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::OneK => "1K",
            ResolutionTier::TwoK => "2K",
            ResolutionTier::FourK => "4K",
        }
    }
}

/// One generation request: the assembled prompt plus every reference image
/// attached to it. The identity image, when present, is the hero shot fed back
/// to keep the persona consistent across a batch.
#[derive(Debug, Clone, Default)]
pub struct GenerateCall {
    pub prompt: String,
    pub identity_image: Option<ImagePayload>,
    pub product_images: Vec<ImagePayload>,
    pub style_images: Vec<ImagePayload>,
    pub accessory_images: Vec<ImagePayload>,
    pub aspect_ratio: Option<AspectRatio>,
    pub image_size: Option<ResolutionTier>,
}

/// Failures are data: an `Err` carries the message shown to the user, and the
/// orchestrator records it per shot instead of aborting the run.
pub type CallResult = std::result::Result<ImagePayload, String>;

pub trait GenerateGateway {
    fn generate(&self, call: &GenerateCall) -> CallResult;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_base: String,
    pub model: String,
    pub fallback_model: String,
    pub api_key: String,
}

impl GatewayConfig {
    /// Reads the gateway configuration from the environment. A missing API key
    /// is a configuration error surfaced here, before any network call.
    pub fn from_env() -> Result<Self> {
        let api_key = non_empty_env("LOOKBOOK_API_KEY")
            .or_else(|| non_empty_env("GEMINI_API_KEY"))
            .context("LOOKBOOK_API_KEY or GEMINI_API_KEY not set")?;
        Ok(Self {
            api_base: non_empty_env("LOOKBOOK_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: non_empty_env("LOOKBOOK_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            fallback_model: non_empty_env("LOOKBOOK_FALLBACK_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_FALLBACK_IMAGE_MODEL.to_string()),
            api_key,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// HTTP gateway to the remote `generateContent` endpoint.
pub struct GeminiGateway {
    config: GatewayConfig,
    http: HttpClient,
}

/// Outcome of one model attempt. `RetryableNotFound` is only produced for
/// HTTP 404 or a "not found" error body; everything else is terminal.
enum Dispatch {
    Success(ImagePayload),
    RetryableNotFound(String),
    Failed(String),
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(GatewayConfig::from_env()?))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base,
            model.trim()
        )
    }

    fn dispatch_once(&self, model: &str, call: &GenerateCall) -> Dispatch {
        let endpoint = self.endpoint_for_model(model);
        let payload = build_payload(call);

        let response = match self
            .http
            .post(&endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&payload)
            .send()
        {
            Ok(response) => response,
            Err(err) => return Dispatch::Failed(format!("network failure: {err}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = format!(
                "generation request failed ({}): {}",
                status.as_u16(),
                truncate(&body, ERROR_BODY_PREVIEW_CHARS)
            );
            if status.as_u16() == 404 || body.contains("not found") {
                return Dispatch::RetryableNotFound(message);
            }
            return Dispatch::Failed(message);
        }

        let parsed: Value = match response.json() {
            Ok(parsed) => parsed,
            Err(err) => return Dispatch::Failed(format!("malformed response body: {err}")),
        };
        match extract_inline_image(&parsed) {
            Ok(image) => Dispatch::Success(image),
            Err(error) => Dispatch::Failed(error),
        }
    }
}

impl GenerateGateway for GeminiGateway {
    fn generate(&self, call: &GenerateCall) -> CallResult {
        resolve_with_fallback(&self.config.model, &self.config.fallback_model, |model| {
            self.dispatch_once(model, call)
        })
    }
}

/// One-level retry: a not-found outcome on the primary model triggers exactly
/// one attempt against the fallback model and nothing more.
fn resolve_with_fallback<F>(primary: &str, fallback: &str, mut attempt: F) -> CallResult
where
    F: FnMut(&str) -> Dispatch,
{
    match attempt(primary) {
        Dispatch::Success(image) => Ok(image),
        Dispatch::Failed(error) => Err(error),
        Dispatch::RetryableNotFound(_) => match attempt(fallback) {
            Dispatch::Success(image) => Ok(image),
            Dispatch::RetryableNotFound(error) | Dispatch::Failed(error) => Err(error),
        },
    }
}

fn build_payload(call: &GenerateCall) -> Value {
    let mut parts: Vec<Value> = Vec::new();
    parts.push(json!({ "text": call.prompt }));

    if let Some(identity) = &call.identity_image {
        parts.push(inline_part(identity));
        parts.push(json!({
            "text": "Keep the model's identity, face, and features consistent with the image above."
        }));
    }

    for product in &call.product_images {
        parts.push(inline_part(product));
    }

    if !call.style_images.is_empty() {
        parts.push(json!({
            "text": "Match the exact style and environment of the following reference images:"
        }));
        for style in &call.style_images {
            parts.push(inline_part(style));
        }
    }

    if !call.accessory_images.is_empty() {
        parts.push(json!({
            "text": "Incorporate the following accessories naturally into the scene:"
        }));
        for accessory in &call.accessory_images {
            parts.push(inline_part(accessory));
        }
    }

    let mut image_config = Map::new();
    if let Some(aspect_ratio) = call.aspect_ratio {
        image_config.insert(
            "aspectRatio".to_string(),
            Value::String(aspect_ratio.as_str().to_string()),
        );
    }
    image_config.insert(
        "image_size".to_string(),
        Value::String(
            call.image_size
                .unwrap_or(ResolutionTier::TwoK)
                .as_str()
                .to_string(),
        ),
    );

    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseModalities": ["IMAGE", "TEXT"],
            "imageConfig": Value::Object(image_config),
        },
    })
}

fn inline_part(image: &ImagePayload) -> Value {
    json!({
        "inline_data": {
            "mime_type": image.mime_type,
            "data": image.data,
        }
    })
}

/// Walks `candidates[*].content.parts[*]` and returns the first inline image,
/// tolerating both `inlineData` and `inline_data` spellings. Missing pieces
/// map to descriptive errors rather than panics.
fn extract_inline_image(response: &Value) -> std::result::Result<ImagePayload, String> {
    let candidates = response
        .get("candidates")
        .and_then(Value::as_array)
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| "generation service returned no candidates".to_string())?;

    let mut saw_parts = false;
    for candidate in candidates {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if !parts.is_empty() {
            saw_parts = true;
        }
        for part in parts {
            let inline = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            return Ok(ImagePayload::new(data, mime_type));
        }
    }

    if saw_parts {
        Err("no image data in response".to_string())
    } else {
        Err("response carried no content parts".to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
