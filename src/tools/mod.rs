//! 보조 도구 모듈
//!
//! - search: DuckDuckGo 웹 검색
//! - translate: 언어 모델 기반 번역
//! - calc: 안전한 사칙연산 계산기

pub mod calc;
pub mod search;
pub mod translate;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub use calc::{calc_tool, safe_eval};
pub use search::{format_hits, no_results_placeholder, DuckDuckGoSearch, SearchHit, WebSearch};
pub use translate::{contains_cjk, translate_or_original, LlmTranslator, Translator};

// ============================================================================
// Language
// ============================================================================

/// 번역/답변 대상 언어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Korean,
    Chinese,
    English,
}

impl Language {
    /// ISO 639-1 코드
    pub fn code(self) -> &'static str {
        match self {
            Language::Korean => "ko",
            Language::Chinese => "zh",
            Language::English => "en",
        }
    }

    /// 프롬프트에 쓰는 이름
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Korean => "한국어",
            Language::Chinese => "중국어",
            Language::English => "영어",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ko" | "kr" | "korean" | "한국어" => Ok(Language::Korean),
            "zh" | "cn" | "chinese" | "중국어" => Ok(Language::Chinese),
            "en" | "english" | "영어" => Ok(Language::English),
            other => Err(format!("unsupported language: {}", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Tool Arguments
// ============================================================================

/// `key=value` 인자 파싱
///
/// 항목 하나가 인자 하나입니다. 첫 `=`에서만 나누므로 값 안의 공백과 `=`는
/// 그대로 유지되고, `=`가 없는 항목은 무시합니다.
pub fn parse_tool_args<S: AsRef<str>>(args: &[S]) -> HashMap<String, String> {
    args.iter()
        .filter_map(|arg| {
            arg.as_ref()
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        })
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
