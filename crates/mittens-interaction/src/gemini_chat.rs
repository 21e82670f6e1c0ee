//! Gemini chat over the `generateContent` REST API.
//!
//! The REST API is stateless, so [`GeminiSession`] keeps the conversation
//! history itself and replays it on every request. Tool calls the model makes
//! are answered with `functionResponse` parts on the following user turn.

use std::sync::Arc;

use async_trait::async_trait;
use mittens_core::chat::{
    ChatClient, ChatSession, IMAGE_TOOL_NAME, ToolCall, ToolOutcome, TurnResult,
};
use mittens_core::config::AppConfig;
use mittens_core::{MittensError, Result, persona};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::http::{API_KEY_HEADER, build_http_client, error_message, model_endpoint};

/// Creates Gemini chat sessions bound to one system instruction and the image tool.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    system_instruction: String,
}

impl GeminiClient {
    /// Creates a client for `config.chat_model` using an existing HTTP client.
    pub fn new(client: Client, config: &AppConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: model_endpoint(&config.api_base_url, &config.chat_model, "generateContent"),
            api_key: api_key.into(),
            system_instruction: persona::SYSTEM_INSTRUCTION.to_string(),
        }
    }

    /// Builds its own HTTP client from the configured timeouts.
    pub fn from_config(config: &AppConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(build_http_client(config)?, config, api_key))
    }

    /// Overrides the system instruction sent with every request.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }
}

impl ChatClient for GeminiClient {
    fn create_session(&self) -> Arc<dyn ChatSession> {
        tracing::debug!(endpoint = %self.endpoint, "Creating Gemini chat session");
        Arc::new(GeminiSession {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            system_instruction: Content::system(&self.system_instruction),
            tools: vec![image_tool_declaration()],
            state: Mutex::new(SessionState::default()),
        })
    }
}

/// One conversation. Owns its history; callers only ever send the new text.
pub struct GeminiSession {
    client: Client,
    endpoint: String,
    api_key: String,
    system_instruction: Content,
    tools: Vec<Tool>,
    state: Mutex<SessionState>,
}

impl GeminiSession {
    async fn send_request(&self, body: &GenerateContentRequest<'_>) -> Result<GenerateContentResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| MittensError::transport(format!("Gemini API request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(MittensError::transport_status(
                status.as_u16(),
                error_message(status, &body_text),
            ));
        }

        response
            .json()
            .await
            .map_err(|err| MittensError::transport(format!("Failed to parse Gemini response: {err}")))
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    async fn send(&self, text: &str) -> Result<TurnResult> {
        // Held for the whole exchange so history stays in request order.
        let mut state = self.state.lock().await;

        if state.is_awaiting_outcome() {
            tracing::warn!("Previous tool call has no recorded outcome; answering it as unreported");
        }
        let user_turn = state.user_turn(text);
        let mut contents = state.history.clone();
        contents.push(user_turn.clone());

        let request = GenerateContentRequest {
            system_instruction: &self.system_instruction,
            tools: &self.tools,
            contents,
        };

        tracing::debug!(history = state.history.len(), "Sending Gemini chat turn");
        let response = self.send_request(&request).await?;
        let model_turn = first_candidate(response)?;

        let result = TurnResult::from_response(model_turn.text(), model_turn.function_calls())?;
        state.commit(user_turn, model_turn, &result);
        Ok(result)
    }

    async fn record_tool_outcome(&self, call: &ToolCall, outcome: &ToolOutcome) {
        self.state.lock().await.record_outcome(call, outcome);
    }
}

const IGNORED_CALL: &str = "Ignored: only one drawing is made per turn.";
const UNREPORTED_CALL: &str = "The result of this call was never reported.";

/// Conversation history plus the tool answers owed to the model.
#[derive(Debug, Default)]
struct SessionState {
    history: Vec<Content>,
    /// One entry per function call of the last model turn, in call order.
    owed: Vec<OwedAnswer>,
}

/// Answer to one function call. `response` stays `None` for the honoured
/// call until its outcome is recorded.
#[derive(Debug, Clone)]
struct OwedAnswer {
    name: String,
    response: Option<Value>,
}

impl SessionState {
    /// Builds the next user turn: owed tool answers first, then the text.
    fn user_turn(&self, text: &str) -> Content {
        let mut parts: Vec<Part> = self
            .owed
            .iter()
            .map(|answer| {
                let response = answer
                    .response
                    .clone()
                    .unwrap_or_else(|| json!({ "error": UNREPORTED_CALL }));
                Part::function_response(&answer.name, response)
            })
            .collect();
        parts.push(Part::text(text));
        Content {
            role: Some("user".to_string()),
            parts,
        }
    }

    /// Appends a successful exchange to history.
    ///
    /// Calls other than the honoured one are answered as ignored right away;
    /// the honoured one keeps its slot until [`SessionState::record_outcome`].
    fn commit(&mut self, user_turn: Content, model_turn: Content, result: &TurnResult) {
        self.owed.clear();

        if let TurnResult::ToolInvocation(selected) = result {
            let mut honoured = false;
            for call in model_turn.function_calls() {
                let response = if !honoured && call == *selected {
                    honoured = true;
                    None
                } else {
                    Some(json!({ "error": IGNORED_CALL }))
                };
                self.owed.push(OwedAnswer {
                    name: call.name,
                    response,
                });
            }
        }

        self.history.push(user_turn);
        self.history.push(model_turn);
    }

    fn record_outcome(&mut self, call: &ToolCall, outcome: &ToolOutcome) {
        let Some(slot) = self
            .owed
            .iter_mut()
            .find(|answer| answer.response.is_none() && answer.name == call.name)
        else {
            tracing::warn!(tool = %call.name, "Tool outcome reported for a call that is not pending");
            return;
        };

        slot.response = Some(match outcome {
            ToolOutcome::Delivered => {
                json!({ "result": "The image was generated and shown to the user." })
            }
            ToolOutcome::Failed(reason) => json!({ "error": reason }),
        });
    }

    fn is_awaiting_outcome(&self) -> bool {
        self.owed.iter().any(|answer| answer.response.is_none())
    }
}

fn first_candidate(response: GenerateContentResponse) -> Result<Content> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(MittensError::transport(format!("Prompt blocked by Gemini: {reason}")));
    }

    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|mut content| {
            content.role = Some("model".to_string());
            content
        })
        .ok_or_else(|| MittensError::transport("Gemini API returned no candidates"))
}

/// Declaration of the `generate_image` tool.
fn image_tool_declaration() -> Tool {
    Tool {
        function_declarations: vec![FunctionDeclaration {
            name: IMAGE_TOOL_NAME.to_string(),
            description: "Generates an image based on a user description.".to_string(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "prompt": {
                        "type": "STRING",
                        "description": "A detailed, cat-centric description of the image to be generated. For example: \"A grumpy cat sitting on a pile of books\"."
                    },
                    "style": {
                        "type": "STRING",
                        "description": "The artistic style for the image. Examples: 'watercolor', 'pencil sketch', 'pixel art', 'oil painting', 'doodle'."
                    }
                },
                "required": ["prompt"]
            }),
        }],
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: &'a Content,
    tools: &'a [Tool],
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Visible text, thought parts excluded; `None` when there is none.
    fn text(&self) -> Option<String> {
        let text: String = self
            .parts
            .iter()
            .filter(|part| part.thought != Some(true))
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }

    fn function_calls(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter_map(|part| part.function_call.as_ref())
            .map(|call| ToolCall::new(call.name.clone(), call.args.clone()))
            .collect()
    }
}

/// A content part. Only one of the payload fields is set on any given part;
/// unknown fields from newer API versions are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn function_response(name: &str, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.to_string(),
                response,
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: Value) -> Result<Content> {
        first_candidate(serde_json::from_value(body).unwrap())
    }

    fn model_turn(parts: Value) -> Content {
        parse(json!({ "candidates": [{ "content": { "role": "model", "parts": parts } }] })).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let system = Content::system(persona::SYSTEM_INSTRUCTION);
        let tools = vec![image_tool_declaration()];
        let request = GenerateContentRequest {
            system_instruction: &system,
            tools: &tools,
            contents: vec![SessionState::default().user_turn("hello")],
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], persona::SYSTEM_INSTRUCTION);
        assert!(body["systemInstruction"].get("role").is_none());
        let declaration = &body["tools"][0]["functionDeclarations"][0];
        assert_eq!(declaration["name"], IMAGE_TOOL_NAME);
        assert_eq!(declaration["parameters"]["required"], json!(["prompt"]));
        assert_eq!(body["contents"], json!([{ "role": "user", "parts": [{ "text": "hello" }] }]));
    }

    #[test]
    fn test_text_reply_skips_thoughts() {
        let turn = model_turn(json!([
            { "text": "thinking about tuna", "thought": true },
            { "text": "Meow. " },
            { "text": "*stares blankly*" }
        ]));
        assert_eq!(
            TurnResult::from_response(turn.text(), turn.function_calls()).unwrap(),
            TurnResult::TextReply("Meow. *stares blankly*".to_string())
        );
    }

    #[test]
    fn test_function_call_reply() {
        let turn = model_turn(json!([
            { "functionCall": { "name": "generate_image", "args": { "prompt": "a fish", "style": "watercolor" } },
              "thoughtSignature": "sig" }
        ]));
        let result = TurnResult::from_response(turn.text(), turn.function_calls()).unwrap();
        assert_eq!(
            result,
            TurnResult::ToolInvocation(ToolCall::new(
                "generate_image",
                json!({ "prompt": "a fish", "style": "watercolor" })
            ))
        );
        // The signature must be replayed with the history.
        assert_eq!(turn.parts[0].thought_signature.as_deref(), Some("sig"));
    }

    #[test]
    fn test_unusable_function_call_is_invalid() {
        let turn = model_turn(json!([{ "functionCall": { "name": "generate_image", "args": {} } }]));
        let err = TurnResult::from_response(turn.text(), turn.function_calls()).unwrap_err();
        assert!(err.is_invalid_tool_call());
    }

    #[test]
    fn test_empty_or_blocked_response_is_transport_error() {
        assert!(parse(json!({})).unwrap_err().is_transport());
        assert!(parse(json!({ "candidates": [] })).unwrap_err().is_transport());
        assert!(
            parse(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap_err()
                .is_transport()
        );
    }

    fn response_of(part: &Part) -> &Value {
        &part.function_response.as_ref().unwrap().response
    }

    #[test]
    fn test_commit_text_turn() {
        let mut state = SessionState::default();
        let user = state.user_turn("hi");
        let model = model_turn(json!([{ "text": "Meow." }]));
        state.commit(user, model, &TurnResult::TextReply("Meow.".to_string()));

        assert_eq!(state.history.len(), 2);
        assert!(state.owed.is_empty());
        assert!(!state.is_awaiting_outcome());
        assert_eq!(state.user_turn("again").parts, vec![Part::text("again")]);
    }

    #[test]
    fn test_tool_answers_follow_call_order() {
        let mut state = SessionState::default();
        let user = state.user_turn("draw a fish");
        let model = model_turn(json!([
            { "functionCall": { "name": "generate_image", "args": { "prompt": "a fish" } } },
            { "functionCall": { "name": "generate_image", "args": { "prompt": "a cat" } } }
        ]));
        let call = ToolCall::new("generate_image", json!({ "prompt": "a fish" }));
        state.commit(user, model, &TurnResult::ToolInvocation(call.clone()));
        assert!(state.is_awaiting_outcome());

        state.record_outcome(&call, &ToolOutcome::Delivered);
        assert!(!state.is_awaiting_outcome());

        let next = state.user_turn("thanks");
        assert_eq!(next.parts.len(), 3);
        assert_eq!(
            response_of(&next.parts[0])["result"],
            "The image was generated and shown to the user."
        );
        assert_eq!(response_of(&next.parts[1])["error"], IGNORED_CALL);
        assert_eq!(next.parts[2], Part::text("thanks"));
    }

    #[test]
    fn test_honoured_call_keeps_its_slot_when_not_first() {
        let mut state = SessionState::default();
        let user = state.user_turn("draw");
        let model = model_turn(json!([
            { "functionCall": { "name": "generate_image", "args": {} } },
            { "functionCall": { "name": "generate_image", "args": { "prompt": "a cat" } } }
        ]));
        let call = ToolCall::new("generate_image", json!({ "prompt": "a cat" }));
        state.commit(user, model, &TurnResult::ToolInvocation(call.clone()));
        state.record_outcome(&call, &ToolOutcome::Failed("filtered".to_string()));

        let next = state.user_turn("oh well");
        assert_eq!(response_of(&next.parts[0])["error"], IGNORED_CALL);
        assert_eq!(response_of(&next.parts[1])["error"], "filtered");
    }

    #[test]
    fn test_unreported_outcome_still_answered() {
        let mut state = SessionState::default();
        let user = state.user_turn("draw");
        let model = model_turn(json!([
            { "functionCall": { "name": "generate_image", "args": { "prompt": "a box" } } }
        ]));
        let call = ToolCall::new("generate_image", json!({ "prompt": "a box" }));
        state.commit(user, model, &TurnResult::ToolInvocation(call));

        let next = state.user_turn("hello?");
        assert_eq!(next.parts.len(), 2);
        assert_eq!(response_of(&next.parts[0])["error"], UNREPORTED_CALL);
    }

    #[test]
    fn test_outcome_without_pending_call_is_ignored() {
        let mut state = SessionState::default();
        state.record_outcome(
            &ToolCall::new("generate_image", json!({ "prompt": "a fish" })),
            &ToolOutcome::Delivered,
        );
        assert_eq!(state.user_turn("hi").parts, vec![Part::text("hi")]);
    }

    #[test]
    fn test_session_starts_empty() {
        let client = GeminiClient::new(Client::new(), &AppConfig::default(), "key");
        assert!(client.endpoint.ends_with("/models/gemini-2.5-flash:generateContent"));
        let _session = client.create_session();
    }
}
