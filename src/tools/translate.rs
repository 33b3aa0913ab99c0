//! 번역 도구 - 언어 모델 기반
//!
//! 고유명사는 유지하고 설명 없이 번역문만 반환하도록 지시합니다.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::Language;
use crate::knowledge::{is_hangul, is_ideograph};
use crate::llm::ChatModel;

/// 번역 트레이트
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: Language) -> Result<String>;
}

/// ChatModel을 사용하는 번역기
pub struct LlmTranslator {
    model: Arc<dyn ChatModel>,
}

impl LlmTranslator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

/// 번역 시스템 지시문
fn system_prompt(target: Language) -> String {
    format!(
        "당신은 번역 도우미입니다. 사용자의 내용을 {}로 정확히 번역하세요. \
         설명하거나 내용을 덧붙이지 말고, 고유명사는 그대로 유지하세요.",
        target.display_name()
    )
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, text: &str, target: Language) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let translated = self.model.generate(&system_prompt(target), text).await?;
        Ok(translated.trim().to_string())
    }
}

/// 번역 실패 시 원문 반환
pub async fn translate_or_original(
    translator: &dyn Translator,
    text: &str,
    target: Language,
) -> String {
    match translator.translate(text, target).await {
        Ok(translated) if !translated.trim().is_empty() => translated,
        Ok(_) => text.to_string(),
        Err(e) => {
            tracing::warn!("Translation to {} failed, keeping original: {}", target, e);
            text.to_string()
        }
    }
}

/// 한자 또는 한글 포함 여부 (검색 전 영어 번역 판단용)
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| is_ideograph(c) || is_hangul(c))
}

// ============================================================================
// Tests
// ============================================================================
