use anyhow::{Context, Result};
use gemstudio_contracts::operations::Operation;
use gemstudio_contracts::parts::{ProviderResponse, ResponsePart};

use crate::result::OperationResult;

/// Folds response parts into one result.
///
/// Text parts are joined with newlines and trimmed; when nothing remains the
/// operation's success message is used. Every image part is decoded and the
/// last one wins. Decode failures are returned to the caller unclassified.
pub fn interpret_response(
    operation: Operation,
    response: &ProviderResponse,
) -> Result<OperationResult> {
    let mut text = String::new();
    let mut image = None;

    for (idx, part) in response.parts.iter().enumerate() {
        match part {
            ResponsePart::Text(fragment) if !fragment.is_empty() => {
                text.push_str(fragment);
                text.push('\n');
            }
            ResponsePart::Text(_) => {}
            ResponsePart::Image(inline) => {
                let decoded = image::load_from_memory(&inline.data).with_context(|| {
                    format!(
                        "failed decoding image part {idx} ({})",
                        inline.mime_type.as_deref().unwrap_or("unknown type")
                    )
                })?;
                image = Some(decoded);
            }
        }
    }

    Ok(OperationResult::success(operation, image, &text))
}
