//! Tool calls and the per-turn response shape.

use serde_json::{Map, Value};

use crate::error::{MittensError, Result};

/// Name of the single tool declared to the model.
pub const IMAGE_TOOL_NAME: &str = "generate_image";

/// A function call requested by the model. Transient; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Map<String, Value>,
}

impl ToolCall {
    /// Builds a call from a raw JSON argument value; non-object args become empty.
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }
}

/// A validated `generate_image` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub style: Option<String>,
}

impl ImageRequest {
    /// Accepts the call only if it names the image tool and carries a string `prompt`.
    ///
    /// A `style` that is missing, blank or not a string is treated as absent.
    pub fn from_tool_call(call: &ToolCall) -> Option<Self> {
        if call.name != IMAGE_TOOL_NAME {
            return None;
        }
        let prompt = call.args.get("prompt")?.as_str()?.to_string();
        let style = call
            .args
            .get("style")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Some(Self { prompt, style })
    }

    /// Loading line shown while the image is being generated.
    pub fn status_text(&self, artist: &str) -> String {
        match &self.style {
            Some(style) => format!("{artist} is drawing a {} in a {style} style...", self.prompt),
            None => format!("{artist} is drawing a {}...", self.prompt),
        }
    }
}

/// What one `send` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnResult {
    /// Narrative content from the model.
    TextReply(String),
    /// The model asked for a tool instead of (or alongside) text.
    ToolInvocation(ToolCall),
}

impl TurnResult {
    /// Reduces one model response to a `TurnResult`.
    ///
    /// Tool calls win over text. Among several calls only the first valid
    /// image request is kept; when none is valid the turn fails with
    /// `InvalidToolCall`. A response with neither text nor calls is a
    /// transport-level failure.
    pub fn from_response(text: Option<String>, calls: Vec<ToolCall>) -> Result<Self> {
        if !calls.is_empty() {
            let total = calls.len();
            return calls
                .into_iter()
                .find(|call| ImageRequest::from_tool_call(call).is_some())
                .map(TurnResult::ToolInvocation)
                .ok_or_else(|| {
                    MittensError::invalid_tool_call(format!(
                        "none of {total} tool call(s) is a usable {IMAGE_TOOL_NAME} request"
                    ))
                });
        }

        match text {
            Some(text) if !text.trim().is_empty() => Ok(TurnResult::TextReply(text)),
            _ => Err(MittensError::transport("model returned neither text nor a tool call")),
        }
    }
}

/// Result of running a tool, reported back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Delivered,
    Failed(String),
}
