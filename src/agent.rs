//! 지식 에이전트 - 수집, 로컬 질의응답, 로컬 우선 하이브리드 질의응답, 도구 호출
//!
//! 외부 API(임베딩, 생성, 검색, 번역) 실패는 호출 지점에서 자리표시 값으로
//! 바꾸고 로그만 남깁니다. 질의 경로는 에러를 반환하지 않습니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::collector::{CollectionStats, FileCollector};
use crate::config::AgentConfig;
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::IndexError;
use crate::extractor::ContentExtractor;
use crate::knowledge::{
    decide, ensure_sources, format_sources, hybrid_prompt, local_prompt, recursive_chunker,
    score_summary, source_list, Chunker, FusedContext, KeywordExtractor, Passage, ScoredPassage,
    StoreStats, VectorStore, WebEvidence,
};
use crate::llm::{ChatModel, GeminiChat};
use crate::session::Message;
use crate::tools::{
    calc_tool, contains_cjk, format_hits, no_results_placeholder, translate_or_original,
    DuckDuckGoSearch, Language, LlmTranslator, SearchHit, Translator, WebSearch,
};

/// 웹 검색 결과 수
pub const WEB_RESULTS: usize = 5;

/// 답변 생성 실패 시 응답
pub const GENERATION_FAILED: &str = "죄송합니다. 지금은 답변을 생성할 수 없습니다. 잠시 후 다시 시도해 주세요.";

// ============================================================================
// Ingest Report
// ============================================================================

/// 수집 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// 찾은 파일 수
    pub files: usize,
    /// 읽은 문서 수
    pub documents: usize,
    /// 인덱싱된 패시지 수
    pub passages: usize,
}

// ============================================================================
// KnowledgeAgent
// ============================================================================

/// 로컬 우선 RAG 에이전트
pub struct KnowledgeAgent {
    config: AgentConfig,
    store: VectorStore,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatModel>,
    web: Box<dyn WebSearch>,
    translator: Box<dyn Translator>,
    chunker: Box<dyn Chunker>,
    keywords: Box<dyn KeywordExtractor>,
    collector: FileCollector,
    extractor: ContentExtractor,
}

impl KnowledgeAgent {
    /// 설정의 Gemini / DuckDuckGo 구현으로 생성
    pub async fn from_config(config: AgentConfig) -> Result<Self> {
        let embedder = Arc::new(
            create_embedder(config.embedding_dimension).context("임베딩 클라이언트 생성 실패")?,
        );
        let chat: Arc<dyn ChatModel> = Arc::new(
            GeminiChat::from_env(config.model_name.clone()).context("생성 모델 클라이언트 생성 실패")?,
        );
        let web = Box::new(DuckDuckGoSearch::new()?);
        let translator = Box::new(LlmTranslator::new(chat.clone()));

        Ok(Self::with_providers(config, embedder, chat, web, translator).await)
    }

    /// 임의의 구현으로 생성
    ///
    /// 저장된 인덱스가 있으면 불러오고, 없거나 읽을 수 없으면 빈 저장소로 시작합니다.
    pub async fn with_providers(
        config: AgentConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        web: Box<dyn WebSearch>,
        translator: Box<dyn Translator>,
    ) -> Self {
        let index_dir = config.index_dir();
        if let Err(e) = VectorStore::recover(&index_dir) {
            tracing::warn!("Failed to restore previous index for {:?}: {}", index_dir, e);
        }
        let store = match VectorStore::load(&index_dir).await {
            Ok(store) => store,
            Err(IndexError::NotFound(path)) => {
                tracing::warn!("No saved index yet ({:?}); run `ingest` first", path);
                VectorStore::new(config.index_kind, &index_dir)
            }
            Err(e) => {
                tracing::warn!("Failed to load index from {:?}: {}", index_dir, e);
                VectorStore::new(config.index_kind, &index_dir)
            }
        };

        Self {
            chunker: recursive_chunker(config.chunk.clone()),
            keywords: config.keywords.extractor(),
            collector: FileCollector::with_defaults(),
            extractor: ContentExtractor::new(),
            config,
            store,
            embedder,
            chat,
            web,
            translator,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// 파일/폴더를 읽어 인덱스를 새로 만들고 저장
    ///
    /// 읽을 수 있는 문서가 하나도 없으면 기존 인덱스를 그대로 두고 0건을 보고합니다.
    pub async fn ingest(&mut self, paths: &[PathBuf]) -> Result<IngestReport> {
        let files = self.collector.collect(paths);
        let stats = CollectionStats::from_files(&files);
        tracing::info!(
            "Found {} files (md {}, txt {}, pdf {})",
            stats.total_files,
            stats.markdown_files,
            stats.text_files,
            stats.pdf_files
        );

        let documents = self.extractor.extract_all(&files).await;
        if documents.is_empty() {
            tracing::warn!("No usable documents in {:?}", paths);
            return Ok(IngestReport {
                files: files.len(),
                ..Default::default()
            });
        }

        let passages: Vec<Passage> = documents
            .iter()
            .flat_map(|doc| {
                self.chunker
                    .chunk(&doc.text)
                    .into_iter()
                    .map(move |chunk| Passage::new(chunk, doc.source.clone()))
            })
            .collect();

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_documents(&texts)
            .await
            .context("패시지 임베딩 실패")?;

        let index_dir = self.config.index_dir();
        let store =
            VectorStore::rebuild_at(&index_dir, self.config.index_kind, passages, vectors).await?;

        let report = IngestReport {
            files: files.len(),
            documents: documents.len(),
            passages: store.len(),
        };
        self.store = store;

        tracing::info!(
            "Ingested {} documents into {} passages",
            report.documents,
            report.passages
        );
        Ok(report)
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// 질의 임베딩 후 로컬 top-k 검색 (실패 시 빈 결과)
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<ScoredPassage> {
        if self.store.is_empty() {
            return Vec::new();
        }

        let vector = match self.embedder.embed_query(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Query embedding failed: {:#}", e);
                return Vec::new();
            }
        };

        match self.store.search(&vector, k).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Local search failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn generate(&self, system: &str, user: &str) -> String {
        match self.chat.generate(system, user).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Answer generation failed: {:#}", e);
                GENERATION_FAILED.to_string()
            }
        }
    }

    // ========================================================================
    // Answering
    // ========================================================================

    /// 로컬 자료만으로 답변 (출처 목록을 항상 덧붙임)
    pub async fn rag_answer(&self, query: &str) -> String {
        let results = self.retrieve(query, self.config.top_k).await;

        for (i, r) in results.iter().enumerate() {
            tracing::debug!(
                "Top-{} {:.3} {}: {:?}",
                i + 1,
                r.effective_score(),
                r.passage.source(),
                r.passage.text.chars().take(60).collect::<String>()
            );
        }

        let sources = source_list(&results);
        let context = FusedContext::local_only(results);
        let prompt = local_prompt(query, &context, self.config.answer_lang);
        let answer = self.generate(&prompt.system, &prompt.user).await;

        format!("{}\n\n{}", answer.trim_end(), format_sources(&sources))
    }

    /// 로컬 우선 답변
    ///
    /// 로컬 결과가 충분하지 않다고 판정되면 웹 검색 요약을 함께 넣습니다.
    pub async fn smart_answer(&self, query: &str, history: &[Message]) -> String {
        let results = self.retrieve(query, self.config.top_k).await;
        let verdict = decide(query, &results, &self.config.thresholds, self.keywords.as_ref());

        let (max, median) = score_summary(&results);
        tracing::debug!(
            "local results {}: max={:.3} median={:.3} good={} prop={:.2} kw_hits={} keywords={:?}",
            results.len(),
            max,
            median,
            verdict.good_count,
            verdict.proportion,
            verdict.keyword_hits,
            verdict.keywords
        );

        let web = if verdict.is_sufficient {
            tracing::info!("Local material sufficient, skipping web search");
            None
        } else {
            tracing::info!("Local material insufficient, searching the web");
            Some(self.web_evidence(query).await)
        };

        let context = FusedContext::new(web, results);
        let prompt = hybrid_prompt(query, &context, history, self.config.answer_lang);
        let answer = self.generate(&prompt.system, &prompt.user).await;

        ensure_sources(&answer, &context.labels())
    }

    /// 웹 검색 요약 (답변 언어로 번역)
    async fn web_evidence(&self, query: &str) -> WebEvidence {
        let (search_query, hits) = self.search_web(query).await;

        let summary = if hits.is_empty() {
            no_results_placeholder(&search_query)
        } else {
            let raw = format_hits(&search_query, &hits);
            translate_or_original(self.translator.as_ref(), &raw, self.config.answer_lang).await
        };

        WebEvidence::new(query, summary)
    }

    /// 한자/한글 질의는 영어로 바꿔 검색 (실패 시 빈 결과)
    ///
    /// 실제로 검색에 쓴 질의와 결과를 반환합니다.
    async fn search_web(&self, query: &str) -> (String, Vec<SearchHit>) {
        let search_query = if contains_cjk(query) {
            let english =
                translate_or_original(self.translator.as_ref(), query, Language::English).await;
            tracing::debug!("Search query translated: {:?} -> {:?}", query, english);
            english
        } else {
            query.to_string()
        };

        let hits = match self.web.search(&search_query, WEB_RESULTS).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("{} search failed: {:#}", self.web.name(), e);
                Vec::new()
            }
        };

        (search_query, hits)
    }

    // ========================================================================
    // Tools
    // ========================================================================

    /// 이름으로 도구 호출
    ///
    /// - `search q=...`
    /// - `translate text=... target=ko|zh|en`
    /// - `calc expr=...`
    pub async fn call_tool(&self, name: &str, args: &HashMap<String, String>) -> String {
        let arg = |key: &str| args.get(key).map(|v| v.trim()).unwrap_or("");

        match name {
            "search" => {
                let q = arg("q");
                if q.is_empty() {
                    return "[search] q= 인자가 필요합니다".to_string();
                }
                let (search_query, hits) = self.search_web(q).await;
                format_hits(&search_query, &hits)
            }
            "translate" => {
                let text = arg("text");
                if text.is_empty() {
                    return "[translate] text= 인자가 필요합니다".to_string();
                }
                let target = match arg("target") {
                    "" => self.config.answer_lang,
                    code => match code.parse::<Language>() {
                        Ok(lang) => lang,
                        Err(e) => return format!("[translate] {}", e),
                    },
                };
                translate_or_original(self.translator.as_ref(), text, target).await
            }
            "calc" => calc_tool(arg("expr")),
            other => format!("알 수 없는 도구: {}", other),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::knowledge::{IndexKind, SOURCES_HEADING};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    // ========================================================================
    // Mocks
    // ========================================================================

    /// "rust" / "python" 포함 여부로 만드는 3차원 벡터
    struct TopicEmbedder;

    fn topic_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        vec![
            if lower.contains("rust") { 1.0 } else { 0.0 },
            if lower.contains("python") { 1.0 } else { 0.0 },
            0.05,
        ]
    }

    #[async_trait]
    impl EmbeddingProvider for TopicEmbedder {
        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(topic_vector(text))
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| topic_vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "topic"
        }
    }

    struct ScriptedChat {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedChat {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn generate(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => anyhow::bail!("model unavailable"),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct CountingSearch {
        calls: Arc<AtomicUsize>,
        queries: Arc<Mutex<Vec<String>>>,
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl WebSearch for CountingSearch {
        async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.hits.clone())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    /// "[en] ..." 형태로 번역
    struct TagTranslator;

    #[async_trait]
    impl Translator for TagTranslator {
        async fn translate(&self, text: &str, target: Language) -> Result<String> {
            Ok(format!("[{}] {}", target.code(), text))
        }
    }

    struct Harness {
        _dir: TempDir,
        agent: KnowledgeAgent,
        chat: Arc<ScriptedChat>,
        search_calls: Arc<AtomicUsize>,
        search_queries: Arc<Mutex<Vec<String>>>,
    }

    async fn harness(chat: Arc<ScriptedChat>, thresholds: Thresholds) -> Harness {
        harness_with_kind(chat, thresholds, IndexKind::Flat).await
    }

    async fn harness_with_kind(
        chat: Arc<ScriptedChat>,
        thresholds: Thresholds,
        index_kind: IndexKind,
    ) -> Harness {
        let dir = tempfile::Builder::new().prefix("agent").tempdir().unwrap();
        let config = AgentConfig {
            data_dir: dir.path().join("data"),
            index_kind,
            thresholds,
            ..Default::default()
        };

        let search_calls = Arc::new(AtomicUsize::new(0));
        let search_queries = Arc::new(Mutex::new(Vec::new()));
        let web = Box::new(CountingSearch {
            calls: search_calls.clone(),
            queries: search_queries.clone(),
            hits: vec![SearchHit {
                title: "Rust Book".into(),
                snippet: "Ownership is Rust's most unique feature.".into(),
                url: "https://doc.rust-lang.org/book/".into(),
            }],
        });

        let agent = KnowledgeAgent::with_providers(
            config,
            Arc::new(TopicEmbedder),
            chat.clone(),
            web,
            Box::new(TagTranslator),
        )
        .await;

        Harness {
            _dir: dir,
            agent,
            chat,
            search_calls,
            search_queries,
        }
    }

    fn write_docs(dir: &std::path::Path) -> PathBuf {
        let docs = dir.join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(
            docs.join("rust.md"),
            "# Rust\nRust ownership rules keep memory safe without a garbage collector.",
        )
        .unwrap();
        std::fs::write(docs.join("broken.txt"), [0xffu8, 0xfe, 0x80]).unwrap();
        docs
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    #[tokio::test]
    async fn test_ingest_skips_unreadable_and_persists() {
        let mut h = harness(ScriptedChat::replying("ok"), Thresholds::default()).await;
        let docs = write_docs(h._dir.path());

        let report = h.agent.ingest(&[docs]).await.unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.documents, 1);
        assert!(report.passages >= 1);

        let index_dir = h.agent.config().index_dir();
        assert!(index_dir.join("docs.json").exists());
        assert!(index_dir.join("meta.json").exists());
        assert!(index_dir.join("index.npy").exists());

        // 재시작 시 저장된 인덱스를 불러옴
        let reloaded = reload(h.agent.config().clone()).await;
        assert_eq!(reloaded.stats().passage_count, report.passages);
    }

    #[tokio::test]
    async fn test_ingest_without_documents_reports_zero() {
        let mut h = harness(ScriptedChat::replying("ok"), Thresholds::default()).await;
        let empty = h._dir.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();

        let report = h.agent.ingest(&[empty]).await.unwrap();
        assert_eq!(report, IngestReport::default());
        assert_eq!(h.agent.stats().passage_count, 0);
    }

    async fn reload(config: AgentConfig) -> KnowledgeAgent {
        KnowledgeAgent::with_providers(
            config,
            Arc::new(TopicEmbedder),
            ScriptedChat::replying("ok"),
            Box::new(CountingSearch {
                calls: Arc::new(AtomicUsize::new(0)),
                queries: Arc::new(Mutex::new(Vec::new())),
                hits: vec![],
            }),
            Box::new(TagTranslator),
        )
        .await
    }

    #[tokio::test]
    async fn test_lance_ingest_twice_and_reload() {
        let mut h =
            harness_with_kind(ScriptedChat::replying("ok"), Thresholds::default(), IndexKind::Lance)
                .await;
        let docs = write_docs(h._dir.path());
        h.agent.ingest(&[docs.clone()]).await.unwrap();

        // 두 번째 ingest는 열려 있는 테이블을 교체
        std::fs::remove_file(docs.join("rust.md")).unwrap();
        std::fs::write(
            docs.join("python.md"),
            "# Python
Python uses reference counting for memory management.",
        )
        .unwrap();
        let report = h.agent.ingest(&[docs]).await.unwrap();
        assert_eq!(report.documents, 1);

        let index_dir = h.agent.config().index_dir();
        assert!(index_dir.join("index.lance").is_dir());
        assert!(index_dir.join("meta.json").exists());
        let parent = index_dir.parent().unwrap();
        assert!(!parent.join("memory.staging").exists());
        assert!(!parent.join("memory.previous").exists());

        let reloaded = reload(h.agent.config().clone()).await;
        assert_eq!(reloaded.stats().passage_count, report.passages);
        let results = reloaded.retrieve("python memory", 5).await;
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.passage.source().ends_with("python.md")));
    }

    // ========================================================================
    // Answering
    // ========================================================================

    #[tokio::test]
    async fn test_empty_store_smart_answer_uses_web() {
        let h = harness(ScriptedChat::replying("답변입니다."), Thresholds::default()).await;

        let answer = h.agent.smart_answer("What is Rust ownership?", &[]).await;

        assert_eq!(h.search_calls.load(Ordering::SeqCst), 1);
        assert!(answer.starts_with("답변입니다."));
        assert!(answer.contains(SOURCES_HEADING));
        assert!(answer.contains("웹 검색: What is Rust ownership? (DuckDuckGo)"));

        let prompt = h.chat.last_prompt();
        assert!(prompt.contains("[웹 검색 결과]"));
        // 웹 요약은 답변 언어(ko)로 번역됨
        assert!(prompt.contains("[ko] - Rust Book"));
        assert!(!prompt.contains("[로컬 자료]"));
    }

    #[tokio::test]
    async fn test_sufficient_local_skips_web() {
        let mut h = harness(
            ScriptedChat::replying("Rust는 소유권으로 메모리를 관리합니다."),
            Thresholds::new(0.5, 1, 0.1),
        )
        .await;
        let docs = write_docs(h._dir.path());
        h.agent.ingest(&[docs]).await.unwrap();

        let answer = h.agent.smart_answer("rust ownership", &[]).await;

        assert_eq!(h.search_calls.load(Ordering::SeqCst), 0);
        assert!(answer.contains("rust.md"));
        let prompt = h.chat.last_prompt();
        assert!(prompt.contains("[로컬 자료]"));
        assert!(!prompt.contains("[웹 검색 결과]"));
    }

    #[tokio::test]
    async fn test_insufficient_local_searches_with_history() {
        let mut h = harness(ScriptedChat::replying("ok"), Thresholds::new(0.5, 3, 0.4)).await;
        let docs = write_docs(h._dir.path());
        h.agent.ingest(&[docs]).await.unwrap();

        let history = vec![Message::user("안녕"), Message::assistant("안녕하세요")];
        h.agent.smart_answer("rust ownership", &history).await;

        assert_eq!(h.search_calls.load(Ordering::SeqCst), 1);
        let prompt = h.chat.last_prompt();
        assert!(prompt.contains("이전 대화:"));
        assert!(prompt.contains("[웹 검색 결과]"));
        assert!(prompt.contains("[로컬 자료]"));
    }

    #[tokio::test]
    async fn test_cjk_query_translated_before_search() {
        let h = harness(ScriptedChat::replying("ok"), Thresholds::default()).await;
        h.agent.smart_answer("러스트 소유권이란?", &[]).await;

        let queries = h.search_queries.lock().unwrap();
        assert_eq!(queries.as_slice(), ["[en] 러스트 소유권이란?"]);
    }

    #[tokio::test]
    async fn test_rag_answer_appends_sources() {
        let h = harness(ScriptedChat::replying("모릅니다."), Thresholds::default()).await;
        let answer = h.agent.rag_answer("rust").await;

        assert_eq!(answer, format!("모릅니다.\n\n{}", format_sources(&[])));
        assert!(h.chat.last_prompt().contains("(자료 없음)"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_apology() {
        let h = harness(ScriptedChat::failing(), Thresholds::default()).await;

        let answer = h.agent.smart_answer("rust", &[]).await;
        assert!(answer.starts_with(GENERATION_FAILED));
        assert!(answer.contains(SOURCES_HEADING));

        let answer = h.agent.rag_answer("rust").await;
        assert!(answer.starts_with(GENERATION_FAILED));
    }

    // ========================================================================
    // Tools
    // ========================================================================

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_call_tool_calc() {
        let h = harness(ScriptedChat::replying("ok"), Thresholds::default()).await;
        assert_eq!(h.agent.call_tool("calc", &args(&[("expr", "1+2*3")])).await, "7");
        assert!(h
            .agent
            .call_tool("calc", &args(&[("expr", "import os")]))
            .await
            .contains("illegal characters"));
    }

    #[tokio::test]
    async fn test_call_tool_translate() {
        let h = harness(ScriptedChat::replying("ok"), Thresholds::default()).await;

        let out = h
            .agent
            .call_tool("translate", &args(&[("text", "hello"), ("target", "zh")]))
            .await;
        assert_eq!(out, "[zh] hello");

        let out = h.agent.call_tool("translate", &args(&[("text", "hello")])).await;
        assert_eq!(out, "[ko] hello");

        let out = h.agent.call_tool("translate", &args(&[])).await;
        assert!(out.contains("text="));
    }

    #[tokio::test]
    async fn test_call_tool_search_and_unknown() {
        let h = harness(ScriptedChat::replying("ok"), Thresholds::default()).await;

        let out = h.agent.call_tool("search", &args(&[("q", "rust book")])).await;
        assert!(out.contains("https://doc.rust-lang.org/book/"));
        assert_eq!(h.search_calls.load(Ordering::SeqCst), 1);

        let out = h.agent.call_tool("weather", &args(&[])).await;
        assert_eq!(out, "알 수 없는 도구: weather");
    }
}
