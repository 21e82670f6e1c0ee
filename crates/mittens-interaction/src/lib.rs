//! Remote clients for the Gemini family of APIs.
//!
//! - [`GeminiClient`] / [`GeminiSession`]: chat with tool calling (`generateContent`)
//! - [`ImagenClient`]: image generation (`predict`)

pub mod gemini_chat;
pub mod http;
pub mod imagen_api;

pub use gemini_chat::{GeminiClient, GeminiSession};
pub use http::build_http_client;
pub use imagen_api::{ImagenClient, compose_prompt};
