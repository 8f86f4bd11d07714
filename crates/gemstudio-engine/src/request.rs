use std::io::Cursor;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use gemstudio_contracts::operations::Operation;
use image::{DynamicImage, ImageFormat};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Provider-neutral description of one `generateContent` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub operation: Operation,
    pub prompt: String,
    pub parts: Vec<Value>,
    pub response_modalities: Option<Vec<String>>,
    pub safety_settings: Vec<Value>,
    /// SHA-256 of the encoded source image, edit requests only.
    pub source_digest: Option<String>,
}

impl ContentRequest {
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            Value::Array(vec![json!({
                "role": "user",
                "parts": self.parts,
            })]),
        );
        payload.insert(
            "safetySettings".to_string(),
            Value::Array(self.safety_settings.clone()),
        );
        if let Some(modalities) = self.response_modalities.as_ref() {
            payload.insert(
                "generationConfig".to_string(),
                json!({ "responseModalities": modalities }),
            );
        }
        Value::Object(payload)
    }
}

pub fn generate_request(prompt: &str) -> ContentRequest {
    ContentRequest {
        operation: Operation::Generate,
        prompt: prompt.to_string(),
        parts: vec![text_part(prompt)],
        response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
        safety_settings: permissive_safety_settings(),
        source_digest: None,
    }
}

pub fn edit_request(prompt: &str, source: &DynamicImage) -> Result<ContentRequest> {
    let encoded = encode_png(source).context("failed encoding source image as PNG")?;
    let digest = hex::encode(Sha256::digest(&encoded));
    Ok(ContentRequest {
        operation: Operation::Edit,
        prompt: prompt.to_string(),
        parts: vec![text_part(prompt), inline_png_part(&encoded)],
        response_modalities: None,
        safety_settings: permissive_safety_settings(),
        source_digest: Some(digest),
    })
}

/// Only the sexually-explicit category is relaxed; every other category keeps the provider default.
pub fn permissive_safety_settings() -> Vec<Value> {
    vec![json!({
        "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "threshold": "BLOCK_NONE",
    })]
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

fn inline_png_part(bytes: &[u8]) -> Value {
    json!({
        "inlineData": {
            "mimeType": "image/png",
            "data": BASE64.encode(bytes),
        }
    })
}
