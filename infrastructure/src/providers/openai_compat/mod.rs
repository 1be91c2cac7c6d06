//! OpenAI-compatible chat completions provider.

mod gateway;
pub mod stream;
pub mod types;

pub use gateway::OpenAiCompatibleGateway;
