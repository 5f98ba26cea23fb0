//! Wire types for the Gemini `generateContent` API

use serde::{Deserialize, Serialize};

/// A single entry in the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user turn with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Create a user turn carrying a function response
    pub fn function_response(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part {
                text: None,
                function_call: None,
                function_response: Some(FunctionResponse {
                    name: name.into(),
                    response,
                }),
            }],
        }
    }
}

/// One part of a content entry. Exactly one of the fields is set;
/// Gemini models parts as a union.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
            function_response: None,
        }
    }
}

/// The model's structured choice of tool name and arguments for one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// The result of a tool call, reported back into the model's context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

/// A tool made available to the model for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Container for function declarations in a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Sampling parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// A plain text request with no tools attached
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            tools: None,
            generation_config: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation_config = Some(GenerationConfig {
            temperature: Some(temperature),
        });
        self
    }
}

/// Response body for `models/{model}:generateContent`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    /// The first candidate's content, if any
    pub fn content(&self) -> Option<&Content> {
        self.candidates.first().and_then(|c| c.content.as_ref())
    }

    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> String {
        self.content()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// The first function call in the first candidate, if the model
    /// requested one. At most one call per turn in this protocol.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.content()
            .and_then(|content| content.parts.iter().find_map(|p| p.function_call.as_ref()))
    }
}

/// Error body returned by the API on non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_creation() {
        let content = Content::user("Hello");
        assert_eq!(content.role, "user");
        assert_eq!(content.parts[0].text.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_deserialize_function_call() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "dynamic_tool", "args": {"prompt": "add"}}}]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        let call = response.function_call().expect("expected a function call");
        assert_eq!(call.name, "dynamic_tool");
        assert_eq!(call.args["prompt"], "add");
    }

    #[test]
    fn test_text_without_call() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "thinking "}, {"text": "aloud"}]}
            }]
        }"#;

        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(response.function_call().is_none());
        assert_eq!(response.text(), "thinking aloud");
    }

    #[test]
    fn test_serialize_function_response_camel_case() {
        let content = Content::function_response("dynamic_tool", serde_json::json!({"result": 7}));
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["parts"][0]["functionResponse"]["name"], "dynamic_tool");
        assert_eq!(json["parts"][0]["functionResponse"]["response"]["result"], 7);
    }

    #[test]
    fn test_request_skips_empty_fields() {
        let request = GenerateRequest::text("hi");
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_deserialize_error_body() {
        let json = r#"{"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.error.code, 429);
        assert_eq!(body.error.status, "RESOURCE_EXHAUSTED");
    }
}
