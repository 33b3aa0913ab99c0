//! 질의 키워드 추출
//!
//! 충분성 판정의 키워드 커버리지 검사에 쓰이는 토큰화 전략입니다.
//! - `cjk`: 2자 이상 연속된 한자 (U+4E00..=U+9FA5)
//! - `words`: 공백 구분 문자권용, 3자 이상 영숫자 토큰 (불용어 제외, 소문자)
//! - `auto`: 한자 → 한글(2음절 이상) → 단어 순서로 합친 결과

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// 질의당 최대 키워드 수
pub const MAX_KEYWORDS: usize = 6;

/// 단어 토큰 최소 길이 (문자 수)
const MIN_WORD_CHARS: usize = 3;

/// 2자 이상 연속된 한자
const IDEOGRAPH_RUN: &str = "[\u{4e00}-\u{9fa5}]{2,}";

/// 2음절 이상 연속된 한글
const HANGUL_RUN: &str = "[\u{ac00}-\u{d7a3}]{2,}";

static IDEOGRAPH_RE: OnceLock<Option<Regex>> = OnceLock::new();
static HANGUL_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// 영어 불용어 (단어 전략용)
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "what", "which", "who", "whom", "whose", "when",
    "where", "why", "how", "does", "did", "has", "have", "had", "this", "that", "these", "those",
    "with", "from", "about", "into", "than", "then", "there", "their", "them", "they", "you",
    "your", "can", "could", "should", "would", "will", "shall", "may", "might", "must", "not",
    "but", "all", "any", "some", "its", "our", "out", "also", "just", "more", "most", "such",
    "tell", "explain", "please", "between", "over", "under",
];

// ============================================================================
// KeywordExtractor Trait
// ============================================================================

/// 키워드 추출 전략 트레이트
pub trait KeywordExtractor: Send + Sync {
    /// 질의에서 키워드 추출 (최대 `MAX_KEYWORDS`개, 중복 없음, 소문자)
    fn extract(&self, query: &str) -> Vec<String>;

    /// 전략 이름
    fn name(&self) -> &'static str;
}

/// 연속 한자 구간
#[derive(Debug, Clone, Copy, Default)]
pub struct IdeographRuns;

impl KeywordExtractor for IdeographRuns {
    fn extract(&self, query: &str) -> Vec<String> {
        let mut out = Vec::new();
        push_unique(&mut out, script_runs(&IDEOGRAPH_RE, IDEOGRAPH_RUN, query));
        out
    }

    fn name(&self) -> &'static str {
        "cjk"
    }
}

/// 공백 구분 문자권 단어 토큰
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokens;

impl KeywordExtractor for WordTokens {
    fn extract(&self, query: &str) -> Vec<String> {
        let mut out = Vec::new();
        push_unique(&mut out, word_tokens(query));
        out
    }

    fn name(&self) -> &'static str {
        "words"
    }
}

/// 혼합 전략 (한자, 한글, 단어)
#[derive(Debug, Clone, Copy, Default)]
pub struct MixedScripts;

impl KeywordExtractor for MixedScripts {
    fn extract(&self, query: &str) -> Vec<String> {
        let mut out = Vec::new();
        push_unique(&mut out, script_runs(&IDEOGRAPH_RE, IDEOGRAPH_RUN, query));
        push_unique(&mut out, script_runs(&HANGUL_RE, HANGUL_RUN, query));
        push_unique(&mut out, word_tokens(query));
        out
    }

    fn name(&self) -> &'static str {
        "auto"
    }
}

// ============================================================================
// Strategy Selector
// ============================================================================

/// 설정용 전략 선택자 (`RAG_KEYWORDS`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordStrategy {
    Cjk,
    Words,
    #[default]
    Auto,
}

impl KeywordStrategy {
    /// 전략 구현체 생성
    pub fn extractor(self) -> Box<dyn KeywordExtractor> {
        match self {
            KeywordStrategy::Cjk => Box::new(IdeographRuns),
            KeywordStrategy::Words => Box::new(WordTokens),
            KeywordStrategy::Auto => Box::new(MixedScripts),
        }
    }
}

impl FromStr for KeywordStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cjk" | "ideograph" | "zh" => Ok(KeywordStrategy::Cjk),
            "words" | "word" | "latin" => Ok(KeywordStrategy::Words),
            "auto" | "mixed" => Ok(KeywordStrategy::Auto),
            other => Err(format!("unknown keyword strategy: {}", other)),
        }
    }
}

impl fmt::Display for KeywordStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeywordStrategy::Cjk => "cjk",
            KeywordStrategy::Words => "words",
            KeywordStrategy::Auto => "auto",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Matching
// ============================================================================

/// 텍스트가 키워드 중 하나라도 포함하는지 (대소문자 무시)
pub fn contains_any(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let lowered = text.to_lowercase();
    keywords.iter().any(|kw| lowered.contains(kw.as_str()))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// CJK 통합 한자 (U+4E00..=U+9FA5)
#[inline]
pub fn is_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// 한글 음절 (U+AC00..=U+D7A3)
#[inline]
pub fn is_hangul(c: char) -> bool {
    ('\u{ac00}'..='\u{d7a3}').contains(&c)
}

/// 패턴에 맞는 구간 전체 (패턴은 처음 호출 때 한 번 컴파일)
fn script_runs(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> Vec<String> {
    let re = cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid keyword pattern {:?}: {}", pattern, e);
            None
        }
    });

    match re {
        Some(re) => re.find_iter(text).map(|m| m.as_str().to_string()).collect(),
        None => Vec::new(),
    }
}

/// 한자/한글이 아닌 영숫자 토큰 (소문자, 불용어 제외)
fn word_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() || is_ideograph(c) || is_hangul(c))
        .filter(|t| t.chars().count() >= MIN_WORD_CHARS)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// 중복 없이 추가 (최대 `MAX_KEYWORDS`)
fn push_unique(out: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if out.len() >= MAX_KEYWORDS {
            return;
        }
        if !out.contains(&item) {
            out.push(item);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
