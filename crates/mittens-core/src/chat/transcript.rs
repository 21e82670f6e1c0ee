//! The ordered conversation log and its persistence contract.

use std::sync::Arc;

use serde::Serialize;

use super::message::Message;
use crate::persona;
use crate::repository::KeyValueStore;

/// Storage key holding the serialized transcript.
pub const TRANSCRIPT_KEY: &str = "chatHistory";

/// Ordered, append-only sequence of messages.
///
/// A transcript is never empty: it is created from the greeting seed or from
/// a non-empty persisted sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

#[allow(clippy::len_without_is_empty)]
impl Transcript {
    /// A fresh transcript holding only the greeting.
    pub fn seeded() -> Self {
        Self {
            messages: vec![Message::model(persona::GREETING)],
        }
    }

    /// Wraps restored messages; `None` when the sequence is empty.
    pub fn from_messages(messages: Vec<Message>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self { messages })
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> &Message {
        // Non-empty by construction.
        &self.messages[self.messages.len() - 1]
    }

    /// True when the transcript is exactly the greeting seed.
    pub fn is_seed(&self) -> bool {
        *self == Self::seeded()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::seeded()
    }
}

/// Loads, saves and clears the transcript through a [`KeyValueStore`].
///
/// None of the operations fail: unreadable or malformed data is treated as
/// absent, and write failures are logged and dropped so the chat keeps going.
#[derive(Clone)]
pub struct TranscriptStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl TranscriptStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, TRANSCRIPT_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Returns the persisted transcript, or the seed when nothing usable is stored.
    pub fn load(&self) -> Transcript {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Transcript::seeded(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read chat history, starting fresh");
                return Transcript::seeded();
            }
        };

        match parse_transcript(&raw) {
            Some(transcript) => {
                tracing::debug!(key = %self.key, messages = transcript.len(), "Restored chat history");
                transcript
            }
            None => {
                tracing::warn!(key = %self.key, "Stored chat history is malformed or empty, ignoring it");
                Transcript::seeded()
            }
        }
    }

    /// Persists the full transcript, overwriting prior state.
    pub fn save(&self, transcript: &Transcript) {
        let json = match serde_json::to_string(transcript) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize chat history");
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, &json) {
            tracing::error!(key = %self.key, error = %e, "Failed to save chat history");
        }
    }

    /// Removes the persisted transcript entirely.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            tracing::error!(key = %self.key, error = %e, "Failed to clear chat history");
        }
    }
}

fn parse_transcript(raw: &str) -> Option<Transcript> {
    let messages: Vec<Message> = serde_json::from_str(raw).ok()?;
    Transcript::from_messages(messages)
}
