//! AI Integration Module
//!
//! The Assistant Gateway: question answering over a document and
//! requirement summarization, backed by an external text-generation
//! provider.

pub mod client;
pub mod gateway;
pub mod prompts;

pub use client::{AiError, CommandProvider, DisabledProvider, GenerationRequest, TextProvider};
pub use gateway::{AssistantGateway, CancelToken, PendingReply, ReplyState};
