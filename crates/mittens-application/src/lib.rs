//! Application layer for Mittens.
//!
//! Coordinates the chat session, image generation and transcript persistence
//! behind a single [`TurnOrchestrator`].

pub mod orchestrator;

pub use orchestrator::{
    ChatView, FailureKind, SubmitError, TurnOrchestrator, TurnOutcome, TurnState,
};
