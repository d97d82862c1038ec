//! Wire types for the Gemini-style generateContent REST API.

use serde::{Deserialize, Serialize};

/// Response of `GET /v1beta/models`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Fully qualified model name, e.g. `models/gemini-1.5-flash`
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods.iter().any(|m| m == "generateContent")
    }
}

/// Request body of `POST /v1beta/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_jpeg(base64_data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/jpeg".to_string(),
                data: base64_data,
            }),
        }
    }
}

/// Base64 payload embedded directly in the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Response body of `POST /v1beta/{model}:generateContent`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any was produced.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_catalog() {
        let body = r#"{
            "models": [
                {"name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]},
                {"name": "models/weird"}
            ]
        }"#;

        let parsed: ListModelsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.models.len(), 3);
        assert!(parsed.models[0].supports_generation());
        assert!(!parsed.models[1].supports_generation());
        assert!(!parsed.models[2].supports_generation());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text("prompt"), Part::inline_jpeg("aGVsbG8=".to_string())],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        let part = &json["contents"][0]["parts"][1];
        assert_eq!(part["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(part["inlineData"]["data"], "aGVsbG8=");
        // The text slot must be absent, not null
        assert!(part.get("text").is_none());
    }

    #[test]
    fn test_response_text_extraction() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "The photo "}, {"text": "shows a harbor."}]}}
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("The photo shows a harbor."));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(empty.text().is_none());
    }
}
