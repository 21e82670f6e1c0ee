//! Remote collaborator traits.
//!
//! The orchestrator only sees these traits; the Gemini and Imagen clients in
//! `mittens-interaction` implement them, and tests supply mocks.

use std::sync::Arc;

use async_trait::async_trait;

use super::image::GeneratedImage;
use super::tool::{ToolCall, ToolOutcome, TurnResult};
use crate::error::Result;

/// A stateful conversation with the remote model.
///
/// The session owns the conversation history. Callers send only the new user
/// text each turn and never replay earlier turns.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Sends one user message in the context of the accumulated history.
    ///
    /// # Returns
    ///
    /// - `Ok(TurnResult::TextReply)`: narrative reply
    /// - `Ok(TurnResult::ToolInvocation)`: first usable tool call
    /// - `Err(MittensError::Transport)`: the call could not complete
    /// - `Err(MittensError::InvalidToolCall)`: tool calls present but none usable
    async fn send(&self, text: &str) -> Result<TurnResult>;

    /// Reports how a requested tool call went, so the next request can answer it.
    async fn record_tool_outcome(&self, _call: &ToolCall, _outcome: &ToolOutcome) {}
}

/// Factory for chat sessions bound to a fixed system prompt and tool set.
pub trait ChatClient: Send + Sync {
    /// Creates a new session. No network call is made.
    fn create_session(&self) -> Arc<dyn ChatSession>;
}

/// Stateless image generation.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates one square image for `prompt`, optionally in `style`.
    ///
    /// Fails with `MittensError::ImageGeneration` when no image comes back.
    async fn generate_image(&self, prompt: &str, style: Option<&str>) -> Result<GeneratedImage>;
}
