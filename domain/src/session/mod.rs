//! Analysis session domain.
//!
//! - [`entities::AnalysisSession`] - one request's status and ordered event log
//! - [`conversation::Conversation`] - messages exchanged with the model
//! - [`response::LlmResponse`] - a completed model turn
//! - [`stream::StreamEvent`] - incremental model output

pub mod conversation;
pub mod entities;
pub mod response;
pub mod stream;
