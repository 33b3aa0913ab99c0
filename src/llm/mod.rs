//! 언어 모델 모듈 - Gemini `generateContent`
//!
//! 시스템 지시문 + 사용자 메시지 한 번으로 답변을 생성합니다.
//! 답변 생성과 번역 도구가 같은 트레이트를 사용합니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::{api_error, get_api_key, GEMINI_API_BASE};

/// 생성 요청 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// 기본 temperature (근거 중심 답변)
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// 최대 출력 토큰
const MAX_OUTPUT_TOKENS: u32 = 4096;

// ============================================================================
// ChatModel Trait
// ============================================================================

/// 채팅 모델 트레이트
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 시스템 지시문과 사용자 메시지로 답변 생성
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// GeminiChat
// ============================================================================

/// Gemini 생성 모델
#[derive(Debug)]
pub struct GeminiChat {
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiChat {
    /// # Arguments
    /// * `api_key` - Google AI API 키
    /// * `model` - 모델 이름 (예: gemini-2.0-flash)
    pub fn new(api_key: String, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            client,
        })
    }

    /// 환경변수 API 키로 생성
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        Self::new(get_api_key()?, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model)
    }

    fn build_request(&self, system: &str, user: &str) -> GenerateRequest {
        let system_instruction = if system.trim().is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part {
                    text: system.to_string(),
                }],
            })
        };

        GenerateRequest {
            system_instruction,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let request = self.build_request(system, user);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generateContent request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generateContent response")?;

        let text = parsed.text();
        if text.trim().is_empty() {
            anyhow::bail!("Model returned an empty response");
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// 첫 후보의 텍스트 파트를 이어 붙임
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let chat = GeminiChat::new("fake_key".to_string(), "gemini-2.0-flash").unwrap();
        let value = serde_json::to_value(chat.build_request("sys", "hello")).unwrap();

        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], MAX_OUTPUT_TOKENS);
    }

    #[test]
    fn test_empty_system_omitted() {
        let chat = GeminiChat::new("fake_key".to_string(), "m").unwrap();
        let value = serde_json::to_value(chat.build_request("  ", "hi")).unwrap();
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn test_endpoint_uses_model() {
        let chat = GeminiChat::new("k".to_string(), "gemini-1.5-pro").unwrap();
        assert!(chat.endpoint().ends_with("/models/gemini-1.5-pro:generateContent"));
        assert_eq!(chat.name(), "gemini-1.5-pro");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"안녕"},{"text":"하세요"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text(), "안녕하세요");

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), "");
    }
}
