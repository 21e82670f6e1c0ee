//! Chat domain module.
//!
//! # Module Structure
//!
//! - `message`: transcript entries (`Message`, `MessageRole`)
//! - `transcript`: the ordered log and its persistence (`Transcript`, `TranscriptStore`)
//! - `tool`: tool calls and per-turn results (`ToolCall`, `ImageRequest`, `TurnResult`)
//! - `image`: generated image payloads (`GeneratedImage`)
//! - `client`: remote collaborator traits (`ChatClient`, `ChatSession`, `ImageGenerator`)

mod client;
mod image;
mod message;
mod tool;
mod transcript;

pub use client::{ChatClient, ChatSession, ImageGenerator};
pub use image::{GeneratedImage, PNG_MIME_TYPE};
pub use message::{Message, MessageRole};
pub use tool::{IMAGE_TOOL_NAME, ImageRequest, ToolCall, ToolOutcome, TurnResult};
pub use transcript::{TRANSCRIPT_KEY, Transcript, TranscriptStore};
