pub mod config;
pub mod interpret;
pub mod provider;
pub mod request;
pub mod result;
pub mod studio;

pub use config::ProviderConfig;
pub use interpret::interpret_response;
pub use provider::{ContentProvider, DryrunProvider, GeminiProvider};
pub use request::{edit_request, encode_png, generate_request, ContentRequest};
pub use result::OperationResult;
pub use studio::Studio;
