//! Gemini `generateContent` client and wire types.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".into()),
            parts: vec![Part::text(text)],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts.iter().filter_map(|p| p.function_call.as_ref()).collect()
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateResponse {
    pub fn first_content(&self) -> Option<&Content> {
        self.candidates.first().and_then(|c| c.content.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: i64,
    #[serde(default)]
    pub candidates_token_count: i64,
    #[serde(default)]
    pub total_token_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// A text-generation backend. The production implementation talks to Gemini;
/// tests script responses.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> AppResult<GenerateResponse>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("GEMINI_API_KEY is not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: 2,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn try_generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, Attempt> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Attempt::Retry(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::Upstream(format!("Gemini returned {status}: {body}"));
            return Err(if is_retryable(status) { Attempt::Retry(err) } else { Attempt::Fatal(err) });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| Attempt::Fatal(e.into()))?;
        if let Some(reason) = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
            return Err(Attempt::Fatal(AppError::Upstream(format!(
                "Gemini blocked the prompt: {reason}"
            ))));
        }
        Ok(parsed)
    }
}

/// Failed attempt, classified by whether sending it again can help.
enum Attempt {
    Retry(AppError),
    Fatal(AppError),
}

/// Rate limiting and server-side failures are transient; other 4xx (bad key,
/// malformed request) fail the same way every time.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Transient failures are retried with backoff. Retries of one `generate`
/// call count as a single request against the advisor's daily limit; failed
/// attempts produce no tokens.
#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> AppResult<GenerateResponse> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // 1s, 2s, ...
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt - 1))).await;
            }

            match self.try_generate(request).await {
                Ok(response) => return Ok(response),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    if attempt < self.max_retries {
                        tracing::warn!(
                            error = %e,
                            "Gemini request failed (attempt {}/{}), retrying",
                            attempt + 1,
                            self.max_retries + 1
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Upstream("all Gemini attempts failed".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_function_call_response() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "get_financial_metrics",
                            "args": {"startDate": "2024-01-01", "endDate": "2024-01-31"}
                        }
                    }]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 14, "totalTokenCount": 134}
        });
        let resp: GenerateResponse = serde_json::from_value(raw).unwrap();
        let content = resp.first_content().unwrap();
        let calls = content.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_financial_metrics");
        assert_eq!(calls[0].args["endDate"], "2024-01-31");
        assert_eq!(resp.usage_metadata.unwrap().prompt_token_count, 120);
    }

    #[test]
    fn joins_text_parts() {
        let raw = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Spend "}, {"text": "less."}]}}]
        });
        let resp: GenerateResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.first_content().unwrap().text(), "Spend less.");
        assert!(resp.usage_metadata.is_none());
    }

    #[test]
    fn request_serializes_in_gemini_shape() {
        let req = GenerateRequest {
            system_instruction: Content::system("be brief"),
            contents: vec![
                Content::user_text("hi"),
                Content {
                    role: Some("user".into()),
                    parts: vec![Part::function_response("get_financial_metrics", json!({"ok": true}))],
                },
            ],
            tools: vec![Tool { function_declarations: vec![json!({"name": "get_financial_metrics"})] }],
            generation_config: GenerationConfig::default(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(v["systemInstruction"].get("role").is_none());
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["contents"][1]["parts"][0]["functionResponse"]["response"]["ok"], true);
        assert!(v["contents"][1]["parts"][0].get("text").is_none());
        assert_eq!(v["tools"][0]["functionDeclarations"][0]["name"], "get_financial_metrics");
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn only_transient_statuses_are_retried() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::FORBIDDEN));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn client_requires_api_key() {
        assert!(GeminiClient::new(&GeminiConfig::default()).is_err());
        let cfg = GeminiConfig {
            api_key: Some("k".into()),
            base_url: "http://localhost:9/v1beta/".into(),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&cfg).unwrap();
        assert_eq!(
            client.endpoint(),
            format!("http://localhost:9/v1beta/models/{}:generateContent", cfg.model)
        );
    }
}
