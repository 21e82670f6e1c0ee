//! Conversation message types.

use serde::{Deserialize, Serialize};

/// Represents the author of a message in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the model (or a fallback standing in for it).
    Model,
}

/// A single entry in the transcript.
///
/// Persisted as `{"role":"user","text":"...","imageUrl":"data:..."}`; the
/// image URL is omitted when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The author of the message.
    pub role: MessageRole,
    /// The text of the message.
    pub text: String,
    /// Image reference attached to the message (a `data:` URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            image_url: None,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Model,
            text: text.into(),
            image_url: None,
        }
    }

    pub fn model_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Model,
            text: text.into(),
            image_url: Some(image_url.into()),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}
