use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// One schema-constrained generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_content: String,
    pub response_schema: Option<JsonValue>,
}

/// The text-generation collaborator. Returns the model's raw text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Whether the backend enforces `response_schema` natively.
    fn supports_schema(&self) -> bool;

    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
    structured_output: bool,
}

impl GeminiService {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
            structured_output: config.structured_output,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn build_payload(request: &GenerationRequest) -> JsonValue {
        let mut payload = serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }]
            },
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": request.user_content }]
                }
            ],
        });

        if let Some(schema) = &request.response_schema {
            payload["generationConfig"] = serde_json::json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        payload
    }

    /// Pulls the generated text out of a response body. Accepts a top-level
    /// `text` field, the nested `candidates[0].content.parts[*].text` shape,
    /// or a list of such chunks.
    pub fn extract_text(body: &JsonValue) -> Option<String> {
        if let Some(text) = body.get("text").and_then(|t| t.as_str()) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }

        if let Some(chunks) = body.as_array() {
            let joined: String = chunks.iter().filter_map(Self::extract_text).collect();
            return (!joined.is_empty()).then_some(joined);
        }

        let parts = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())?;

        let joined: String = parts
            .iter()
            .filter(|p| !p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        (!joined.is_empty()).then_some(joined)
    }

    fn describe_empty(body: &JsonValue) -> String {
        let finish = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("finishReason"))
            .and_then(|f| f.as_str());
        let blocked = body
            .get("promptFeedback")
            .and_then(|f| f.get("blockReason"))
            .and_then(|b| b.as_str());
        match (finish, blocked) {
            (_, Some(reason)) => format!("prompt blocked: {}", reason),
            (Some(reason), None) => format!("finish reason {}", reason),
            (None, None) => "no candidates in response".to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiService {
    fn supports_schema(&self) -> bool {
        self.structured_output
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let payload = Self::build_payload(request);

        tracing::info!(
            model = %self.model,
            schema = request.response_schema.is_some(),
            "Sending generateContent request"
        );
        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.timeout_secs)
                } else {
                    Error::from(e)
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Provider {
                status: status.as_u16(),
                body: crate::utils::text::truncate(&text, 1_000),
            });
        }

        let body: JsonValue = res.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.timeout_secs)
            } else {
                Error::from(e)
            }
        })?;
        let text = Self::extract_text(&body).ok_or_else(|| Error::EmptyResponse(Self::describe_empty(&body)))?;
        tracing::info!(chars = text.chars().count(), "Response received");
        Ok(text)
    }
}
