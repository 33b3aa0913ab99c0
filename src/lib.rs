//! smart-knowledge-agent - 로컬 우선 RAG 질의응답 에이전트
//!
//! 로컬 벡터 검색 결과가 충분한지 판정하고, 부족하면 웹 검색 요약을
//! 함께 넣어 출처가 달린 답변을 생성합니다.

pub mod agent;
pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm;
pub mod scraper;
pub mod session;
pub mod tools;

// Re-exports
pub use agent::{IngestReport, KnowledgeAgent};
pub use config::{get_data_dir, AgentConfig, Thresholds};
pub use embedding::{get_api_key, has_api_key, EmbeddingProvider, GeminiEmbedding};
pub use error::{CalcError, IndexError, IndexResult};
pub use knowledge::{
    decide, default_chunker, ChunkConfig, Chunker, FusedContext, IndexKind, Passage,
    ScoredPassage, StoreStats, SufficiencyVerdict, VectorIndex, VectorStore, WebEvidence,
};
pub use llm::{ChatModel, GeminiChat};
pub use scraper::{BlogFetcher, BlogSource};
pub use session::{Message, Role, SessionStore};
pub use tools::{safe_eval, DuckDuckGoSearch, Language, Translator, WebSearch};
