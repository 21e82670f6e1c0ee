//! HTTP plumbing shared by the Gemini and Imagen clients.

use std::time::Duration;

use mittens_core::config::AppConfig;
use mittens_core::{MittensError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Header carrying the API key, so it never appears in logged URLs.
pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

/// Builds the shared HTTP client with the configured timeouts.
pub fn build_http_client(config: &AppConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| MittensError::config(format!("Failed to build HTTP client: {e}")))
}

/// `{base}/models/{model}:{method}`
pub(crate) fn model_endpoint(base_url: &str, model: &str, method: &str) -> String {
    format!("{}/models/{model}:{method}", base_url.trim_end_matches('/'))
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Human-readable message from a Google API error body, falling back to the raw body.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    format!("HTTP {}: {}", status.as_u16(), detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_google_body() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            error_message(StatusCode::TOO_MANY_REQUESTS, body),
            "HTTP 429: RESOURCE_EXHAUSTED: Quota exceeded"
        );
    }

    #[test]
    fn test_error_message_from_plain_body() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "HTTP 502: upstream down"
        );
    }

    #[test]
    fn test_model_endpoint_trims_slash() {
        assert_eq!(
            model_endpoint("https://example.test/v1beta/", "gemini-2.5-flash", "generateContent"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
