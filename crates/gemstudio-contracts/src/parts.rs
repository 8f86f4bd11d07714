use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Text(String),
    Image(InlineImage),
}

/// Ordered parts returned by a provider for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    pub parts: Vec<ResponsePart>,
}

impl ProviderResponse {
    pub fn new(parts: Vec<ResponsePart>) -> Self {
        Self { parts }
    }

    /// Decodes a `generateContent` payload. Only the first candidate is read.
    pub fn from_generate_content(payload: &Value) -> Result<Self> {
        let candidates = payload
            .get("candidates")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let Some(candidate) = candidates.first() else {
            let block_reason = payload
                .get("promptFeedback")
                .or_else(|| payload.get("prompt_feedback"))
                .and_then(|feedback| {
                    feedback
                        .get("blockReason")
                        .or_else(|| feedback.get("block_reason"))
                })
                .and_then(Value::as_str);
            match block_reason {
                Some(reason) => bail!("response contained no candidates (blocked: {reason})"),
                None => bail!("response contained no candidates"),
            }
        };

        let raw_parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut parts = Vec::with_capacity(raw_parts.len());
        for (idx, raw) in raw_parts.iter().enumerate() {
            if let Some(part) = decode_part(raw).with_context(|| format!("response part {idx}"))? {
                parts.push(part);
            }
        }
        Ok(Self { parts })
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, ResponsePart::Image(_)))
            .count()
    }
}

fn decode_part(raw: &Value) -> Result<Option<ResponsePart>> {
    if let Some(text) = raw.get("text").and_then(Value::as_str) {
        return Ok(Some(ResponsePart::Text(text.to_string())));
    }
    let Some(inline) = raw
        .get("inlineData")
        .or_else(|| raw.get("inline_data"))
        .and_then(Value::as_object)
    else {
        return Ok(None);
    };
    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if data.is_empty() {
        return Ok(None);
    }
    let bytes = BASE64
        .decode(data.as_bytes())
        .context("inline image base64 decode failed")?;
    let mime_type = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(Some(ResponsePart::Image(InlineImage {
        mime_type,
        data: bytes,
    })))
}
