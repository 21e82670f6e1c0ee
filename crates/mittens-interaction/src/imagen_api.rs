//! Image generation through the Imagen `predict` REST API.

use async_trait::async_trait;
use mittens_core::chat::{GeneratedImage, ImageGenerator, PNG_MIME_TYPE};
use mittens_core::config::AppConfig;
use mittens_core::{MittensError, Result, persona};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http::{API_KEY_HEADER, build_http_client, error_message, model_endpoint};

const ASPECT_RATIO: &str = "1:1";

/// Builds the single descriptive prompt sent to Imagen.
pub fn compose_prompt(prompt: &str, style: Option<&str>) -> String {
    let style_description = match style.map(str::trim).filter(|s| !s.is_empty()) {
        Some(style) => format!("in a {style} style"),
        None => persona::DEFAULT_STYLE_DESCRIPTION.to_string(),
    };
    format!("A digital artwork of: {prompt}, {style_description}.")
}

/// Stateless Imagen client producing one square PNG per call.
#[derive(Clone)]
pub struct ImagenClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ImagenClient {
    pub fn new(client: Client, config: &AppConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: model_endpoint(&config.api_base_url, &config.image_model, "predict"),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &AppConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(build_http_client(config)?, config, api_key))
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    async fn generate_image(&self, prompt: &str, style: Option<&str>) -> Result<GeneratedImage> {
        let request = PredictRequest::single(compose_prompt(prompt, style));
        tracing::debug!(endpoint = %self.endpoint, style = ?style, "Requesting image");

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| MittensError::image_generation(format!("Imagen request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Imagen error body".to_string());
            return Err(MittensError::image_generation(error_message(status, &body_text)));
        }

        let parsed: PredictResponse = response.json().await.map_err(|err| {
            MittensError::image_generation(format!("Failed to parse Imagen response: {err}"))
        })?;

        extract_image(parsed)
    }
}

fn extract_image(response: PredictResponse) -> Result<GeneratedImage> {
    let predictions = response.predictions.unwrap_or_default();
    let filtered: Vec<String> = predictions
        .iter()
        .filter_map(|p| p.rai_filtered_reason.clone())
        .collect();

    predictions
        .into_iter()
        .find_map(|p| {
            p.bytes_base64_encoded
                .filter(|data| !data.is_empty())
                .map(|data| GeneratedImage::new(p.mime_type.unwrap_or_else(|| PNG_MIME_TYPE.to_string()), data))
        })
        .ok_or_else(|| {
            if filtered.is_empty() {
                MittensError::image_generation("Image generation failed to produce an image.")
            } else {
                MittensError::image_generation(format!(
                    "Image generation was filtered: {}",
                    filtered.join("; ")
                ))
            }
        })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Instance>,
    parameters: Parameters,
}

impl PredictRequest {
    fn single(prompt: String) -> Self {
        Self {
            instances: vec![Instance { prompt }],
            parameters: Parameters {
                sample_count: 1,
                aspect_ratio: ASPECT_RATIO.to_string(),
                output_options: OutputOptions {
                    mime_type: PNG_MIME_TYPE.to_string(),
                },
            },
        }
    }
}

#[derive(Serialize)]
struct Instance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    sample_count: u32,
    aspect_ratio: String,
    output_options: OutputOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: Option<Vec<Prediction>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
    rai_filtered_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<GeneratedImage> {
        extract_image(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn test_compose_prompt_default_style() {
        let prompt = compose_prompt("a fish", None);
        assert_eq!(
            prompt,
            "A digital artwork of: a fish, in a cute, cartoon-style, playful cat's doodle style."
        );
        assert_eq!(compose_prompt("a fish", Some(" ")), prompt);
    }

    #[test]
    fn test_compose_prompt_explicit_style() {
        assert_eq!(
            compose_prompt("a fish", Some("pixel art")),
            "A digital artwork of: a fish, in a pixel art style."
        );
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(PredictRequest::single("p".to_string())).unwrap();
        assert_eq!(
            body,
            json!({
                "instances": [{ "prompt": "p" }],
                "parameters": {
                    "sampleCount": 1,
                    "aspectRatio": "1:1",
                    "outputOptions": { "mimeType": "image/png" }
                }
            })
        );
    }

    #[test]
    fn test_extract_first_image() {
        let image = parse(json!({
            "predictions": [
                { "raiFilteredReason": "blocked" },
                { "bytesBase64Encoded": "iVBORw0KGgo=", "mimeType": "image/png" }
            ]
        }))
        .unwrap();
        assert_eq!(image.to_data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_no_images_is_image_generation_error() {
        assert!(parse(json!({})).unwrap_err().is_image_generation());
        assert!(parse(json!({ "predictions": [] })).unwrap_err().is_image_generation());
        assert!(
            parse(json!({ "predictions": [{ "bytesBase64Encoded": "" }] }))
                .unwrap_err()
                .is_image_generation()
        );

        let filtered = parse(json!({ "predictions": [{ "raiFilteredReason": "unsafe yarn" }] })).unwrap_err();
        assert!(filtered.to_string().contains("unsafe yarn"));
    }
}
