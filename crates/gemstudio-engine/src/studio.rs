use std::time::Instant;

use anyhow::Result;
use gemstudio_contracts::events::{EventPayload, EventWriter};
use gemstudio_contracts::operations::Operation;
use image::DynamicImage;
use serde_json::{json, Value};

use crate::interpret::interpret_response;
use crate::provider::ContentProvider;
use crate::request::{edit_request, generate_request, ContentRequest};
use crate::result::OperationResult;

/// Owns the provider handle for a session and runs generate/edit calls against it.
pub struct Studio {
    provider: Box<dyn ContentProvider>,
    events: EventWriter,
}

impl Studio {
    pub fn new(provider: Box<dyn ContentProvider>, events: EventWriter) -> Self {
        Self { provider, events }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn generate(&self, prompt: &str) -> OperationResult {
        self.execute(Operation::Generate, prompt, || Ok(generate_request(prompt)))
    }

    pub fn edit(&self, prompt: &str, source: &DynamicImage) -> OperationResult {
        self.execute(Operation::Edit, prompt, || edit_request(prompt, source))
    }

    fn execute<F>(&self, operation: Operation, prompt: &str, build: F) -> OperationResult
    where
        F: FnOnce() -> Result<ContentRequest>,
    {
        let started = Instant::now();
        self.emit_quietly(
            "operation_started",
            json!({
                "operation": operation,
                "provider": self.provider.name(),
                "prompt": prompt,
            }),
        );
        let mut source_sha256 = None;
        let outcome = build().and_then(|request| {
            source_sha256 = request.source_digest.clone();
            let response = self.provider.generate_content(&request)?;
            let result = interpret_response(operation, &response)?;
            Ok((result, response.image_count()))
        });
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((result, image_parts)) => {
                let dims = result
                    .image
                    .as_ref()
                    .map(|image| json!({"width": image.width(), "height": image.height()}))
                    .unwrap_or(Value::Null);
                self.emit_quietly(
                    "operation_finished",
                    json!({
                        "operation": operation,
                        "source_sha256": source_sha256,
                        "has_image": result.has_image(),
                        "image_parts": image_parts,
                        "image": dims,
                        "status": result.status,
                        "elapsed_ms": elapsed_ms,
                    }),
                );
                result
            }
            Err(err) => {
                let result = OperationResult::failure(operation, &err);
                self.emit_quietly(
                    "operation_failed",
                    json!({
                        "operation": operation,
                        "source_sha256": source_sha256,
                        "status": result.status,
                        "elapsed_ms": elapsed_ms,
                    }),
                );
                result
            }
        }
    }

    // The event log never changes an operation's outcome.
    fn emit_quietly(&self, event_type: &str, payload: Value) {
        let payload: EventPayload = payload.as_object().cloned().unwrap_or_default();
        if let Err(err) = self.events.emit(event_type, payload) {
            eprintln!("gemstudio warning: failed writing {event_type} event: {err:#}");
        }
    }
}
