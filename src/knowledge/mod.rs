//! Knowledge 모듈 - 로컬 지식 인덱스와 검색 판단
//!
//! - Chunker: 재귀 문자 분할
//! - Index: 벡터 인덱스 트레이트 (Flat / LanceDB)
//! - Store: 패시지 + 인덱스 저장/로드
//! - Sufficiency: 로컬 결과 충분성 판정
//! - Fusion: 웹/로컬 컨텍스트 융합과 답변 프롬프트

mod chunker;
mod flat;
mod fusion;
mod index;
mod keywords;
mod lance;
mod store;
mod sufficiency;

// Re-exports
pub use chunker::{default_chunker, recursive_chunker, ChunkConfig, Chunker, RecursiveChunker};
pub use flat::FlatIndex;
pub use fusion::{
    ensure_sources, format_sources, hybrid_prompt, local_prompt, source_list, FusedContext,
    Prompt, WebEvidence, NONE_MARKER, NO_MATERIAL, SOURCES_HEADING,
};
pub use index::{normalized, Hit, IndexKind, VectorIndex};
pub use keywords::{
    contains_any, is_hangul, is_ideograph, IdeographRuns, KeywordExtractor, KeywordStrategy,
    MixedScripts, WordTokens, MAX_KEYWORDS,
};
pub use lance::LanceIndex;
pub use store::{Passage, PassageMetadata, ScoredPassage, StoreStats, VectorStore};
pub use sufficiency::{decide, score_summary, SufficiencyVerdict, KEYWORD_WINDOW};
