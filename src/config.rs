//! 설정 모듈 - 환경변수 기반 에이전트 설정
//!
//! 시작 시 한 번 `AgentConfig::from_env()`로 만들고 이후에는 값으로 전달합니다.
//! 충분성 판정 함수는 환경변수를 직접 읽지 않습니다.

use std::path::PathBuf;
use std::str::FromStr;

use crate::knowledge::{ChunkConfig, IndexKind, KeywordStrategy};
use crate::tools::Language;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로
///
/// 우선순위: `RAG_DATA_DIR` > `<data_local_dir>/.smart-knowledge`
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RAG_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".smart-knowledge")
}

// ============================================================================
// Thresholds
// ============================================================================

/// 로컬 충분성 판정 임계값
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// 패시지 하나를 "관련 있음"으로 볼 최소 유사도 (`RAG_SIM_TAU`)
    pub sim_tau: f32,
    /// 필요한 관련 패시지 최소 개수 (`RAG_MIN_GOOD`)
    pub min_good: usize,
    /// 관련 패시지 비율 하한 (`RAG_MIN_PROP`)
    pub min_prop: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            sim_tau: 0.52,
            min_good: 3,
            min_prop: 0.40,
        }
    }
}

impl Thresholds {
    pub fn new(sim_tau: f32, min_good: usize, min_prop: f32) -> Self {
        Self {
            sim_tau,
            min_good,
            min_prop,
        }
    }

    /// 환경변수에서 읽기 (없거나 잘못된 값은 기본값)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 읽기
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            sim_tau: parse_var(&lookup, "RAG_SIM_TAU", defaults.sim_tau),
            min_good: parse_var(&lookup, "RAG_MIN_GOOD", defaults.min_good),
            min_prop: parse_var(&lookup, "RAG_MIN_PROP", defaults.min_prop),
        }
    }
}

// ============================================================================
// AgentConfig
// ============================================================================

/// 기본 생성 모델
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// 에이전트 전체 설정
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// 데이터 디렉토리 (인덱스, 샘플)
    pub data_dir: PathBuf,
    /// 새 인덱스를 만들 때 사용할 백엔드 (`VECTOR_DB`)
    pub index_kind: IndexKind,
    /// 답변 생성 모델 (`MODEL_NAME`)
    pub model_name: String,
    /// 임베딩 차원 (`EMBEDDING_DIMENSION`)
    pub embedding_dimension: usize,
    /// 충분성 임계값
    pub thresholds: Thresholds,
    /// 검색 결과 수 (`RAG_TOP_K`)
    pub top_k: usize,
    /// 키워드 추출 전략 (`RAG_KEYWORDS`)
    pub keywords: KeywordStrategy,
    /// 답변/웹 요약 언어 (`RAG_ANSWER_LANG`)
    pub answer_lang: Language,
    /// 청킹 설정 (`RAG_CHUNK_SIZE`, `RAG_CHUNK_OVERLAP`)
    pub chunk: ChunkConfig,
    /// 세션당 보관할 메시지 수 (`RAG_HISTORY_LIMIT`)
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: get_data_dir(),
            index_kind: IndexKind::Lance,
            model_name: DEFAULT_MODEL.to_string(),
            embedding_dimension: crate::embedding::DEFAULT_DIMENSION,
            thresholds: Thresholds::default(),
            top_k: 5,
            keywords: KeywordStrategy::Auto,
            answer_lang: Language::Korean,
            chunk: ChunkConfig::default(),
            history_limit: 20,
        }
    }
}

impl AgentConfig {
    /// 환경변수에서 설정 생성
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 생성
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("RAG_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let model_name = lookup("MODEL_NAME")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.model_name);

        let chunk = ChunkConfig {
            chunk_size: parse_var(&lookup, "RAG_CHUNK_SIZE", defaults.chunk.chunk_size),
            chunk_overlap: parse_var(&lookup, "RAG_CHUNK_OVERLAP", defaults.chunk.chunk_overlap),
            ..defaults.chunk
        };

        Self {
            data_dir,
            index_kind: parse_var(&lookup, "VECTOR_DB", defaults.index_kind),
            model_name,
            embedding_dimension: parse_var(
                &lookup,
                "EMBEDDING_DIMENSION",
                defaults.embedding_dimension,
            ),
            thresholds: Thresholds::from_lookup(&lookup),
            top_k: parse_var(&lookup, "RAG_TOP_K", defaults.top_k).max(1),
            keywords: parse_var(&lookup, "RAG_KEYWORDS", defaults.keywords),
            answer_lang: parse_var(&lookup, "RAG_ANSWER_LANG", defaults.answer_lang),
            chunk,
            history_limit: parse_var(&lookup, "RAG_HISTORY_LIMIT", defaults.history_limit).max(1),
        }
    }

    /// 벡터 인덱스 저장 디렉토리
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("memory")
    }

    /// fetch-updates 결과 저장 디렉토리
    pub fn samples_dir(&self) -> PathBuf {
        self.data_dir.join("samples")
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 환경변수 값 파싱 (실패 시 경고 후 기본값)
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        _ => default,
    }
}

// ============================================================================
// Tests
// ============================================================================
