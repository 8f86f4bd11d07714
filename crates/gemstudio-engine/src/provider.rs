use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use gemstudio_contracts::parts::{InlineImage, ProviderResponse, ResponsePart};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::ProviderConfig;
use crate::request::{encode_png, ContentRequest};

const DRYRUN_DEFAULT_SIZE: u32 = 512;

/// Client for the external multimodal service. Built once and shared read-only.
pub trait ContentProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate_content(&self, request: &ContentRequest) -> Result<ProviderResponse>;
}

pub struct GeminiProvider {
    api_base: String,
    api_key: String,
    model: String,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed building Gemini HTTP client")?;
        Ok(Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl ContentProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_content(&self, request: &ContentRequest) -> Result<ProviderResponse> {
        let endpoint = self.endpoint();
        // Key travels in a header so transport errors, which echo the URL, never carry it.
        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request.to_payload())
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let payload = response_json_or_error("Gemini", response)?;
        ProviderResponse::from_generate_content(&payload)
            .context("Gemini returned an unreadable response")
    }
}

/// Offline provider answering every request with one solid image keyed on the prompt.
pub struct DryrunProvider;

impl DryrunProvider {
    fn source_dimensions(request: &ContentRequest) -> Result<Option<(u32, u32)>> {
        for part in &request.parts {
            let Some(data) = part
                .get("inlineData")
                .and_then(|inline| inline.get("data"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let bytes = BASE64
                .decode(data.as_bytes())
                .context("dryrun source image base64 decode failed")?;
            let source =
                image::load_from_memory(&bytes).context("dryrun source image decode failed")?;
            return Ok(Some(source.dimensions()));
        }
        Ok(None)
    }
}

impl ContentProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_content(&self, request: &ContentRequest) -> Result<ProviderResponse> {
        let (width, height) = Self::source_dimensions(request)?
            .unwrap_or((DRYRUN_DEFAULT_SIZE, DRYRUN_DEFAULT_SIZE));
        let [r, g, b] = color_from_prompt(&request.prompt);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([r, g, b])));
        let data = encode_png(&image)?;
        Ok(ProviderResponse::new(vec![ResponsePart::Image(
            InlineImage {
                mime_type: Some("image/png".to_string()),
                data,
            },
        )]))
    }
}

fn color_from_prompt(prompt: &str) -> [u8; 3] {
    let digest = Sha256::digest(prompt.as_bytes());
    [digest[0], digest[1], digest[2]]
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
