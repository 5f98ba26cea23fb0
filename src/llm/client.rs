//! Gemini API client

use super::types::*;
use crate::error::ModelError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The seam between the agent and the remote model. Production code talks
/// to Gemini through [`GeminiClient`]; tests substitute a scripted stub.
#[async_trait::async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError>;
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client for the given model
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build headers for API requests
    fn headers(&self) -> Result<HeaderMap, ModelError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| ModelError::Rejected("API key contains invalid characters".into()))?,
        );

        Ok(headers)
    }

    /// Classify a non-2xx response into the error taxonomy.
    ///
    /// 429 / RESOURCE_EXHAUSTED is throttling; 5xx is a transient server
    /// fault; anything else is a rejection the limiter will not retry.
    fn classify_error(status: StatusCode, body: &str) -> ModelError {
        let detail = serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or(ApiErrorDetail {
                code: status.as_u16(),
                message: body.to_string(),
                status: String::new(),
            });

        if status == StatusCode::TOO_MANY_REQUESTS || detail.status == "RESOURCE_EXHAUSTED" {
            ModelError::Throttled(detail.message)
        } else if status.is_server_error() {
            ModelError::ServerFault(format!("{}: {}", status, detail.message))
        } else {
            ModelError::Rejected(format!("{}: {}", status, detail.message))
        }
    }

    async fn post_generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let url = format!("{}/models/{}:generateContent", API_BASE_URL, self.model);

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::classify_error(status, &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }

    /// Check whether the configured API key is accepted by the service.
    /// A one-off minimal generation; any error counts as invalid.
    pub async fn probe(&self) -> bool {
        self.post_generate(&GenerateRequest::text("Hello!")).await.is_ok()
    }
}

#[async_trait::async_trait]
impl ModelTransport for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        self.post_generate(request).await
    }
}
