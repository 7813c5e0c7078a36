//! Generative Service Providers
//!
//! Thin clients for the external text and image services. Both speak an
//! OpenAI-compatible wire shape; both are hidden behind traits so the
//! generators (and tests) never depend on the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::core::campaign::deliverable_types::ImageSize;

/// How much of an error body is kept when surfacing API failures.
const ERROR_BODY_LIMIT: usize = 500;

// ============================================================================
// Errors
// ============================================================================

/// Unified error type for generation calls.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Non-2xx response from the service.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 2xx response whose body is missing the expected fields.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Structurally valid response with nothing usable in it.
    #[error("Empty result: {0}")]
    Empty(String),
}

impl GenerationError {
    /// Create an invalid-response error with the given message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create an empty-result error with the given message.
    pub fn empty(msg: impl Into<String>) -> Self {
        Self::Empty(msg.into())
    }
}

/// Result type alias for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

// ============================================================================
// Service Traits
// ============================================================================

/// The external generative-text service, reduced to the one call this core
/// makes: a single user-role prompt in, a primary text field out.
#[async_trait]
pub trait TextGenService: Send + Sync {
    async fn complete(&self, prompt: &str) -> GenerationResult<String>;
}

/// The external generative-image service: one prompt, one image, a size
/// chosen by deliverable type. Returns an image reference (URL or encoded
/// payload).
#[async_trait]
pub trait ImageGenService: Send + Sync {
    async fn render(&self, prompt: &str, size: ImageSize) -> GenerationResult<String>;
}

// ============================================================================
// HTTP Text Provider
// ============================================================================

/// Reqwest-backed text provider speaking the OpenAI-compatible
/// `/chat/completions` shape.
pub struct HttpTextService {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: Client,
}

impl HttpTextService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            max_tokens,
            client,
        }
    }
}

#[async_trait]
impl TextGenService for HttpTextService {
    async fn complete(&self, prompt: &str) -> GenerationResult<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: truncate(&text, ERROR_BODY_LIMIT),
            });
        }

        let json: serde_json::Value = resp.json().await?;

        json["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|c| c["message"]["content"].as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| GenerationError::invalid("Missing content"))
    }
}

// ============================================================================
// HTTP Image Provider
// ============================================================================

/// Reqwest-backed image provider speaking the OpenAI-compatible
/// `/images/generations` shape.
pub struct HttpImageService {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl HttpImageService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(180))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait]
impl ImageGenService for HttpImageService {
    async fn render(&self, prompt: &str, size: ImageSize) -> GenerationResult<String> {
        let url = format!("{}/images/generations", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": size.api_value(),
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: truncate(&text, ERROR_BODY_LIMIT),
            });
        }

        let json: serde_json::Value = resp.json().await?;

        let datum = json["data"]
            .as_array()
            .and_then(|arr| arr.first())
            .ok_or_else(|| GenerationError::invalid("Missing image data"))?;

        if let Some(reference) = datum["url"].as_str() {
            return Ok(reference.to_string());
        }
        if let Some(b64) = datum["b64_json"].as_str() {
            return Ok(format!("data:image/png;base64,{b64}"));
        }

        Err(GenerationError::invalid("Image data carries neither url nor payload"))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        text.to_string()
    } else {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_body() {
        assert_eq!(truncate("short", 500), "short");
    }

    #[test]
    fn test_truncate_long_body() {
        let long = "x".repeat(600);
        let result = truncate(&long, 500);
        assert_eq!(result.chars().count(), 501); // 500 + ellipsis
        assert!(result.ends_with('…'));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(300); // 2 bytes each
        let result = truncate(&text, 501);
        assert!(result.ends_with('…'));
    }

    #[test]
    fn test_error_display() {
        let err = GenerationError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API error (429): rate limited");

        let err = GenerationError::empty("no concepts");
        assert_eq!(err.to_string(), "Empty result: no concepts");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let svc = HttpTextService::new("https://api.example.com/v1/", "key", "model-x", 512);
        assert_eq!(svc.base_url, "https://api.example.com/v1");
    }
}
