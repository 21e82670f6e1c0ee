//! Error types for the Mittens application.

use thiserror::Error;

/// A shared error type for the entire Mittens application.
///
/// The first three variants form the turn taxonomy the orchestrator converts
/// into fallback messages; the rest come from storage and configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MittensError {
    /// The remote chat call could not complete (network, HTTP status, malformed body).
    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The model asked for a tool call that cannot be honoured.
    #[error("Invalid tool call: {0}")]
    InvalidToolCall(String),

    /// The image request produced no usable image.
    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    /// Key-value persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MittensError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a Transport error carrying the HTTP status code.
    pub fn transport_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates an InvalidToolCall error
    pub fn invalid_tool_call(message: impl Into<String>) -> Self {
        Self::InvalidToolCall(message.into())
    }

    /// Creates an ImageGeneration error
    pub fn image_generation(message: impl Into<String>) -> Self {
        Self::ImageGeneration(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_invalid_tool_call(&self) -> bool {
        matches!(self, Self::InvalidToolCall(_))
    }

    pub fn is_image_generation(&self) -> bool {
        matches!(self, Self::ImageGeneration(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// HTTP status attached to a transport failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for MittensError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MittensError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MittensError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, MittensError>`.
pub type Result<T> = std::result::Result<T, MittensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_errors_are_distinguishable() {
        let transport = MittensError::transport_status(503, "UNAVAILABLE: overloaded");
        let tool = MittensError::invalid_tool_call("prompt is missing");
        let image = MittensError::image_generation("no images returned");

        assert!(transport.is_transport());
        assert!(!transport.is_invalid_tool_call());
        assert!(tool.is_invalid_tool_call());
        assert!(image.is_image_generation());
        assert_eq!(transport.status(), Some(503));
        assert_eq!(tool.status(), None);
    }

    #[test]
    fn test_json_error_conversion() {
        let err: MittensError = serde_json::from_str::<Vec<u8>>("{not json")
            .unwrap_err()
            .into();
        match err {
            MittensError::Serialization { format, .. } => assert_eq!(format, "JSON"),
            other => panic!("Expected Serialization error, got {other:?}"),
        }
    }
}
