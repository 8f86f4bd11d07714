use gemstudio_contracts::operations::Operation;
use image::DynamicImage;

/// Outcome of one generate or edit call. `status` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub operation: Operation,
    pub image: Option<DynamicImage>,
    pub status: String,
}

impl OperationResult {
    pub fn success(operation: Operation, image: Option<DynamicImage>, text: &str) -> Self {
        let trimmed = text.trim();
        let status = if trimmed.is_empty() {
            operation.success_message().to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            operation,
            image,
            status,
        }
    }

    /// Collapses any error into a labelled status with no image.
    pub fn failure(operation: Operation, err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let message = message.trim();
        let status = if message.is_empty() {
            operation.error_label().to_string()
        } else {
            format!("{}: {message}", operation.error_label())
        };
        Self {
            operation,
            image: None,
            status,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}
