//! Turn orchestration.
//!
//! [`TurnOrchestrator`] owns the chat session and the transcript. It drives a
//! single turn at a time through `Idle -> Sending -> AwaitingImage -> Idle`,
//! turns every remote failure into a fallback message, and persists the
//! transcript after each change.

use std::sync::Arc;

use mittens_core::chat::{
    ChatClient, ChatSession, ImageGenerator, ImageRequest, Message, ToolCall, ToolOutcome,
    Transcript, TranscriptStore, TurnResult,
};
use mittens_core::persona;
use thiserror::Error;
use tokio::sync::{Mutex, watch};

/// Where the current turn is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Ready for input.
    Idle,
    /// Waiting on the chat call.
    Sending,
    /// A text reply arrived and is being appended.
    AwaitingText,
    /// Waiting on the image call.
    AwaitingImage,
}

/// Why a submission was refused. A refused submission changes nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a turn is already in progress")]
    TurnInProgress,
}

/// Which failure produced a fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    InvalidToolCall,
    ImageGeneration,
}

/// How an accepted turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered with text.
    Replied,
    /// An image was generated and appended.
    Drew,
    /// A fallback message was appended.
    Fallback(FailureKind),
    /// A reset happened while the turn was in flight; its result was dropped.
    Discarded,
}

/// Snapshot consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub transcript: Transcript,
    pub state: TurnState,
    pub is_loading: bool,
    pub loading_status_text: Option<String>,
}

struct Inner {
    session: Arc<dyn ChatSession>,
    transcript: Transcript,
    state: TurnState,
    status_text: Option<String>,
    /// Bumped on every reset; a turn carrying an older epoch is stale.
    epoch: u64,
}

impl Inner {
    fn view(&self) -> ChatView {
        ChatView {
            transcript: self.transcript.clone(),
            state: self.state,
            is_loading: self.state != TurnState::Idle,
            loading_status_text: self.status_text.clone(),
        }
    }
}

/// Drives chat turns for one conversation.
///
/// Shared behind an `Arc`; the internal lock is never held across a remote
/// call, so `reset` stays available while a turn is in flight.
pub struct TurnOrchestrator {
    client: Arc<dyn ChatClient>,
    images: Arc<dyn ImageGenerator>,
    store: TranscriptStore,
    inner: Mutex<Inner>,
    view_tx: watch::Sender<ChatView>,
}

impl TurnOrchestrator {
    /// Restores the transcript from `store` (or seeds it) and opens a session.
    pub fn new(
        client: Arc<dyn ChatClient>,
        images: Arc<dyn ImageGenerator>,
        store: TranscriptStore,
    ) -> Self {
        let inner = Inner {
            session: client.create_session(),
            transcript: store.load(),
            state: TurnState::Idle,
            status_text: None,
            epoch: 0,
        };
        let (view_tx, _) = watch::channel(inner.view());

        Self {
            client,
            images,
            store,
            inner: Mutex::new(inner),
            view_tx,
        }
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.view_tx.subscribe()
    }

    /// Latest published snapshot.
    pub fn view(&self) -> ChatView {
        self.view_tx.borrow().clone()
    }

    pub async fn transcript(&self) -> Transcript {
        self.inner.lock().await.transcript.clone()
    }

    pub async fn state(&self) -> TurnState {
        self.inner.lock().await.state
    }

    /// Runs one turn for `text`.
    ///
    /// # Errors
    ///
    /// Only refusals are errors: blank input, or a turn already in flight.
    /// Every remote failure ends as `Ok(TurnOutcome::Fallback(_))`.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, SubmitError> {
        let (session, epoch) = {
            let mut inner = self.inner.lock().await;
            if text.trim().is_empty() {
                return Err(SubmitError::EmptyInput);
            }
            if inner.state != TurnState::Idle {
                return Err(SubmitError::TurnInProgress);
            }

            inner.transcript.push(Message::user(text));
            inner.state = TurnState::Sending;
            inner.status_text = None;
            self.persist_and_publish(&inner);
            (inner.session.clone(), inner.epoch)
        };

        tracing::debug!(epoch, "Turn started");
        match session.send(text).await {
            Ok(TurnResult::TextReply(reply)) => {
                if !self.advance(epoch, TurnState::AwaitingText, None).await {
                    return Ok(TurnOutcome::Discarded);
                }
                self.finish(epoch, Message::model(reply), TurnOutcome::Replied)
                    .await
            }
            Ok(TurnResult::ToolInvocation(call)) => match ImageRequest::from_tool_call(&call) {
                Some(request) => self.draw(session, epoch, call, request).await,
                None => {
                    tracing::warn!(tool = %call.name, "Tool call is missing a usable prompt");
                    self.fallback(epoch, FailureKind::InvalidToolCall).await
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Chat turn failed");
                let kind = if e.is_invalid_tool_call() {
                    FailureKind::InvalidToolCall
                } else {
                    FailureKind::Transport
                };
                self.fallback(epoch, kind).await
            }
        }
    }

    /// Starts a new chat: fresh session, seeded transcript, storage cleared.
    ///
    /// Allowed in any state. An in-flight turn keeps running against the old
    /// session but its result is discarded.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.session = self.client.create_session();
        inner.transcript = Transcript::seeded();
        inner.state = TurnState::Idle;
        inner.status_text = None;

        self.store.clear();
        self.view_tx.send_replace(inner.view());
        tracing::info!(epoch = inner.epoch, "Started a new chat");
    }

    async fn draw(
        &self,
        session: Arc<dyn ChatSession>,
        epoch: u64,
        call: ToolCall,
        request: ImageRequest,
    ) -> Result<TurnOutcome, SubmitError> {
        let status_text = request.status_text(persona::NAME);
        if !self
            .advance(epoch, TurnState::AwaitingImage, Some(status_text))
            .await
        {
            return Ok(TurnOutcome::Discarded);
        }

        match self
            .images
            .generate_image(&request.prompt, request.style.as_deref())
            .await
        {
            Ok(image) => {
                session.record_tool_outcome(&call, &ToolOutcome::Delivered).await;
                let message = Message::model_with_image(persona::IMAGE_CAPTION, image.to_data_url());
                self.finish(epoch, message, TurnOutcome::Drew).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image generation failed");
                session
                    .record_tool_outcome(&call, &ToolOutcome::Failed(e.to_string()))
                    .await;
                self.fallback(epoch, FailureKind::ImageGeneration).await
            }
        }
    }

    async fn fallback(&self, epoch: u64, kind: FailureKind) -> Result<TurnOutcome, SubmitError> {
        let text = match kind {
            FailureKind::Transport | FailureKind::InvalidToolCall => persona::TRANSPORT_FALLBACK,
            FailureKind::ImageGeneration => persona::IMAGE_FALLBACK,
        };
        self.finish(epoch, Message::model(text), TurnOutcome::Fallback(kind))
            .await
    }

    /// Moves a live turn into `state` and publishes it. Returns `false` when a
    /// reset made the turn stale.
    async fn advance(&self, epoch: u64, state: TurnState, status_text: Option<String>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return false;
        }
        inner.state = state;
        inner.status_text = status_text;
        self.view_tx.send_replace(inner.view());
        true
    }

    /// Appends the terminal message of a turn and returns to `Idle`, unless a
    /// reset made the turn stale.
    async fn finish(
        &self,
        epoch: u64,
        message: Message,
        outcome: TurnOutcome,
    ) -> Result<TurnOutcome, SubmitError> {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            tracing::debug!(
                epoch,
                current = inner.epoch,
                "Dropping result of a turn started before reset"
            );
            return Ok(TurnOutcome::Discarded);
        }

        inner.transcript.push(message);
        inner.state = TurnState::Idle;
        inner.status_text = None;
        self.persist_and_publish(&inner);
        tracing::debug!(?outcome, messages = inner.transcript.len(), "Turn finished");
        Ok(outcome)
    }

    fn persist_and_publish(&self, inner: &Inner) {
        self.store.save(&inner.transcript);
        self.view_tx.send_replace(inner.view());
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
