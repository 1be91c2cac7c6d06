//! Language-model providers.
//!
//! All supported providers speak the OpenAI chat completions wire format;
//! [`ProviderRegistry`] picks base URL, credentials and model per request.

pub mod openai_compat;
mod registry;

pub use openai_compat::OpenAiCompatibleGateway;
pub use registry::ProviderRegistry;
