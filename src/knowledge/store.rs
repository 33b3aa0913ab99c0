//! Vector Store - 패시지 목록 + 벡터 인덱스
//!
//! 패시지와 인덱스는 항상 함께 교체됩니다. 인덱스의 i번째 벡터는
//! 패시지 목록의 i번째 항목에 대응합니다.
//!
//! 저장 디렉토리 구성:
//! - `docs.json`: `[{ "page_content": ..., "metadata": { "source": ... } }]`
//! - `index.npy` 또는 `index.lance/`: 백엔드별 인덱스
//! - `meta.json`: `{ "db_type": ..., "index_type": ... }`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::index::{build_index, load_index, IndexKind, VectorIndex};
use crate::error::{IndexError, IndexResult};

/// 패시지 파일 이름
pub const DOCS_FILE: &str = "docs.json";

/// 메타데이터 파일 이름
pub const META_FILE: &str = "meta.json";

/// 새 인덱스를 만드는 형제 디렉토리 접미사
const STAGING_SUFFIX: &str = "staging";

/// 교체 중 이전 인덱스를 잠시 옮겨 두는 형제 디렉토리 접미사
const PREVIOUS_SUFFIX: &str = "previous";

// ============================================================================
// Types
// ============================================================================

/// 패시지 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// 원본 문서 식별자 (파일 경로 등)
    #[serde(default)]
    pub source: String,
    /// 검색 시 부여된 유사도
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// 인덱싱 단위 텍스트 조각
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    #[serde(rename = "page_content")]
    pub text: String,
    #[serde(default)]
    pub metadata: PassageMetadata,
}

impl Passage {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: PassageMetadata {
                source: source.into(),
                score: None,
            },
        }
    }

    /// 출처 (없으면 "unknown")
    pub fn source(&self) -> &str {
        if self.metadata.source.is_empty() {
            "unknown"
        } else {
            &self.metadata.source
        }
    }
}

/// 검색 결과 항목
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: Option<f32>,
}

impl ScoredPassage {
    pub fn new(passage: Passage, score: f32) -> Self {
        Self {
            passage,
            score: Some(score),
        }
    }

    /// 유효 유사도 (없거나 NaN/inf면 0.0)
    pub fn effective_score(&self) -> f32 {
        self.score
            .or(self.passage.metadata.score)
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
    }
}

/// meta.json 내용
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreMeta {
    db_type: String,
    index_type: String,
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub passage_count: usize,
    pub sources: usize,
    pub backend: String,
    pub dimension: Option<usize>,
    pub workdir: PathBuf,
}

// ============================================================================
// VectorStore
// ============================================================================

/// 패시지 + 벡터 인덱스 저장소
pub struct VectorStore {
    kind: IndexKind,
    workdir: PathBuf,
    passages: Vec<Passage>,
    index: Option<Box<dyn VectorIndex>>,
}

impl VectorStore {
    /// 빈 저장소 생성
    ///
    /// # Arguments
    /// * `kind` - build 시 사용할 백엔드
    /// * `workdir` - 백엔드 작업 디렉토리 (보통 인덱스 저장 디렉토리와 같음)
    pub fn new(kind: IndexKind, workdir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            workdir: workdir.into(),
            passages: Vec::new(),
            index: None,
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    /// 인덱스 재구성
    ///
    /// 새 인덱스를 완전히 만든 뒤에 패시지 목록과 함께 교체합니다.
    /// 실패하면 기존 상태가 유지됩니다.
    pub async fn build(&mut self, passages: Vec<Passage>, vectors: Vec<Vec<f32>>) -> IndexResult<()> {
        if passages.is_empty() {
            return Err(IndexError::EmptyInput);
        }
        if passages.len() != vectors.len() {
            return Err(IndexError::DimensionMismatch {
                expected: passages.len(),
                actual: vectors.len(),
            });
        }

        let index = build_index(self.kind, &self.workdir, &vectors).await?;

        tracing::info!(
            "Vector index built: {} passages, dim {}, backend {}",
            passages.len(),
            index.dimension(),
            self.kind
        );

        self.passages = passages;
        self.index = Some(index);
        Ok(())
    }

    /// 유사도 내림차순 top-k 검색 (인덱스가 없으면 빈 결과)
    pub async fn search(&self, query_vector: &[f32], k: usize) -> IndexResult<Vec<ScoredPassage>> {
        let index = match &self.index {
            Some(index) if !index.is_empty() => index,
            _ => return Ok(vec![]),
        };

        let hits = index.search(query_vector, k).await?;

        let results = hits
            .into_iter()
            .filter_map(|hit| {
                self.passages.get(hit.id).map(|p| {
                    let mut passage = p.clone();
                    passage.metadata.score = Some(hit.score);
                    ScoredPassage::new(passage, hit.score)
                })
            })
            .collect();

        Ok(results)
    }

    /// 디렉토리에 저장 (docs.json → 인덱스 → meta.json 순서)
    pub async fn persist(&self, dir: &Path) -> IndexResult<()> {
        let index = self.index.as_ref().ok_or(IndexError::EmptyInput)?;

        std::fs::create_dir_all(dir)?;

        let docs = serde_json::to_string_pretty(&self.passages)?;
        std::fs::write(dir.join(DOCS_FILE), docs)?;

        index.persist(dir).await?;

        let meta = StoreMeta {
            db_type: index.kind().db_type().to_string(),
            index_type: index.kind().index_type().to_string(),
        };
        std::fs::write(dir.join(META_FILE), serde_json::to_string_pretty(&meta)?)?;

        tracing::info!("Vector index saved to {:?}", dir);
        Ok(())
    }

    /// 디렉토리에서 로드
    ///
    /// 백엔드는 meta.json에 기록된 값을 따릅니다.
    pub async fn load(dir: &Path) -> IndexResult<Self> {
        let meta_path = dir.join(META_FILE);
        let docs_path = dir.join(DOCS_FILE);

        if !meta_path.exists() {
            return Err(IndexError::NotFound(meta_path));
        }
        if !docs_path.exists() {
            return Err(IndexError::NotFound(docs_path));
        }

        let meta: StoreMeta = serde_json::from_str(&std::fs::read_to_string(&meta_path)?)?;
        let kind = IndexKind::from_index_type(&meta.index_type)
            .or_else(|| meta.db_type.parse().ok())
            .ok_or_else(|| {
                IndexError::Backend(format!("unknown index type in meta.json: {}", meta.index_type))
            })?;

        let passages: Vec<Passage> = serde_json::from_str(&std::fs::read_to_string(&docs_path)?)?;
        let index = load_index(kind, dir).await?;

        if index.len() != passages.len() {
            return Err(IndexError::Backend(format!(
                "index has {} vectors but docs.json has {} passages",
                index.len(),
                passages.len()
            )));
        }

        tracing::info!("Loaded vector index: {} passages ({})", passages.len(), kind);

        Ok(Self {
            kind,
            workdir: dir.to_path_buf(),
            passages,
            index: Some(index),
        })
    }

    /// 저장 디렉토리의 인덱스를 통째로 교체
    ///
    /// `dir` 옆 스테이징 디렉토리에서 build + persist를 끝낸 뒤 디렉토리 이름을
    /// 바꿔 반영합니다. 도중에 실패하면 `dir`의 기존 인덱스는 그대로 남습니다.
    pub async fn rebuild_at(
        dir: &Path,
        kind: IndexKind,
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
    ) -> IndexResult<Self> {
        let staging = sibling_dir(dir, STAGING_SUFFIX);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }

        {
            let mut staged = VectorStore::new(kind, &staging);
            staged.build(passages, vectors).await?;
            staged.persist(&staging).await?;
        }

        swap_into(&staging, dir)?;
        Self::load(dir).await
    }

    /// 중단된 교체 복구
    ///
    /// `dir`에 완성된 인덱스(meta.json)가 없고 이전 인덱스만 남아 있으면 되돌립니다.
    pub fn recover(dir: &Path) -> IndexResult<()> {
        let previous = sibling_dir(dir, PREVIOUS_SUFFIX);
        if dir.join(META_FILE).exists() || !previous.join(META_FILE).exists() {
            return Ok(());
        }

        tracing::warn!("Restoring previous index from {:?}", previous);
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::rename(&previous, dir)?;
        Ok(())
    }

    /// 저장소 통계
    pub fn stats(&self) -> StoreStats {
        let mut sources: Vec<&str> = self.passages.iter().map(|p| p.source()).collect();
        sources.sort_unstable();
        sources.dedup();

        StoreStats {
            passage_count: self.passages.len(),
            sources: sources.len(),
            backend: self.kind.to_string(),
            dimension: self.index.as_ref().map(|i| i.dimension()),
            workdir: self.workdir.clone(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `memory` → `memory.<suffix>`
fn sibling_dir(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    dir.with_file_name(format!("{}.{}", name, suffix))
}

/// 완성된 스테이징 디렉토리를 `dir` 자리로 이동
///
/// 기존 `dir`은 `<dir>.previous`로 옮겼다가 교체가 끝나면 지웁니다.
fn swap_into(staging: &Path, dir: &Path) -> IndexResult<()> {
    let previous = sibling_dir(dir, PREVIOUS_SUFFIX);
    if previous.exists() {
        std::fs::remove_dir_all(&previous)?;
    }

    let had_previous = dir.exists();
    if had_previous {
        std::fs::rename(dir, &previous)?;
    }

    if let Err(e) = std::fs::rename(staging, dir) {
        if had_previous {
            std::fs::rename(&previous, dir)?;
        }
        return Err(e.into());
    }

    if had_previous {
        if let Err(e) = std::fs::remove_dir_all(&previous) {
            tracing::warn!("Failed to remove previous index {:?}: {}", previous, e);
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> (Vec<Passage>, Vec<Vec<f32>>) {
        let passages = vec![
            Passage::new("Transformers use attention.", "a.md"),
            Passage::new("LanceDB stores vectors on disk.", "b.md"),
            Passage::new("Attention weights tokens.", "a.md"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.8, 0.2, 0.0],
        ];
        (passages, vectors)
    }

    #[tokio::test]
    async fn test_search_without_index_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore::new(IndexKind::Flat, dir.path());
        let results = store.search(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_build_rejects_empty_and_mismatch() {
        let dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(IndexKind::Flat, dir.path());

        assert!(matches!(
            store.build(vec![], vec![]).await,
            Err(IndexError::EmptyInput)
        ));

        let (passages, mut vectors) = sample();
        vectors.pop();
        assert!(matches!(
            store.build(passages, vectors).await,
            Err(IndexError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(IndexKind::Flat, dir.path());
        let (passages, vectors) = sample();
        store.build(passages, vectors).await.unwrap();

        let ragged = vec![vec![1.0, 0.0], vec![1.0]];
        let result = store
            .build(vec![Passage::new("x", "x"), Passage::new("y", "y")], ragged)
            .await;
        assert!(result.is_err());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_search_attaches_scores() {
        let dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(IndexKind::Flat, dir.path());
        let (passages, vectors) = sample();
        store.build(passages, vectors).await.unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].passage.text, "Transformers use attention.");
        assert_eq!(results[1].passage.text, "Attention weights tokens.");
        assert!(results[0].effective_score() >= results[1].effective_score());
        assert_eq!(results[0].passage.metadata.score, results[0].score);
    }

    #[tokio::test]
    async fn test_flat_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(IndexKind::Flat, dir.path());
        let (passages, vectors) = sample();
        store.build(passages, vectors).await.unwrap();
        store.persist(dir.path()).await.unwrap();

        assert!(dir.path().join(DOCS_FILE).exists());
        assert!(dir.path().join(META_FILE).exists());
        assert!(dir.path().join("index.npy").exists());

        let loaded = VectorStore::load(dir.path()).await.unwrap();
        assert_eq!(loaded.kind(), IndexKind::Flat);
        assert_eq!(loaded.len(), 3);

        let query = [0.6, 0.4, 0.1];
        let before = store.search(&query, 3).await.unwrap();
        let after = loaded.search(&query, 3).await.unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.passage.text, b.passage.text);
            assert!((a.effective_score() - b.effective_score()).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_lance_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let mut store = VectorStore::new(IndexKind::Lance, dir.path());
        let (passages, vectors) = sample();
        store.build(passages, vectors).await.unwrap();
        store.persist(dir.path()).await.unwrap();

        let loaded = VectorStore::load(dir.path()).await.unwrap();
        assert_eq!(loaded.kind(), IndexKind::Lance);

        let query = [0.1, 0.9, 0.0];
        let before = store.search(&query, 3).await.unwrap();
        let after = loaded.search(&query, 3).await.unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.passage.text, b.passage.text);
            assert!((a.effective_score() - b.effective_score()).abs() < 1e-5);
        }
    }

    fn other_sample() -> (Vec<Passage>, Vec<Vec<f32>>) {
        (
            vec![Passage::new("Replacement passage.", "c.md")],
            vec![vec![0.0, 0.0, 1.0]],
        )
    }

    #[tokio::test]
    async fn test_rebuild_at_replaces_whole_directory() {
        for kind in [IndexKind::Flat, IndexKind::Lance] {
            let root = TempDir::new().unwrap();
            let dir = root.path().join("memory");

            let (passages, vectors) = sample();
            let first = VectorStore::rebuild_at(&dir, kind, passages, vectors).await.unwrap();
            assert_eq!(first.len(), 3);
            drop(first);

            let (passages, vectors) = other_sample();
            let second = VectorStore::rebuild_at(&dir, kind, passages, vectors).await.unwrap();
            assert_eq!(second.len(), 1);
            assert_eq!(second.kind(), kind);

            let results = second.search(&[0.0, 0.0, 1.0], 5).await.unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].passage.source(), "c.md");

            assert!(!root.path().join("memory.staging").exists());
            assert!(!root.path().join("memory.previous").exists());
        }
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_persisted_index() {
        for kind in [IndexKind::Flat, IndexKind::Lance] {
            let root = TempDir::new().unwrap();
            let dir = root.path().join("memory");

            let (passages, vectors) = sample();
            VectorStore::rebuild_at(&dir, kind, passages, vectors).await.unwrap();

            let ragged = vec![vec![1.0, 0.0], vec![1.0]];
            let result = VectorStore::rebuild_at(
                &dir,
                kind,
                vec![Passage::new("x", "x"), Passage::new("y", "y")],
                ragged,
            )
            .await;
            assert!(result.is_err());

            let loaded = VectorStore::load(&dir).await.unwrap();
            assert_eq!(loaded.len(), 3);
            let results = loaded.search(&[0.0, 1.0, 0.0], 1).await.unwrap();
            assert_eq!(results[0].passage.source(), "b.md");
        }
    }

    #[tokio::test]
    async fn test_recover_interrupted_swap() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("memory");
        let previous = root.path().join("memory.previous");

        let (passages, vectors) = sample();
        VectorStore::rebuild_at(&previous, IndexKind::Flat, passages, vectors)
            .await
            .unwrap();
        // 교체 도중 중단: dir은 비어 있고 이전 인덱스만 남음
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DOCS_FILE), "[]").unwrap();

        VectorStore::recover(&dir).unwrap();
        assert!(!previous.exists());
        assert_eq!(VectorStore::load(&dir).await.unwrap().len(), 3);

        // 완성된 인덱스가 있으면 아무것도 하지 않음
        VectorStore::recover(&dir).unwrap();
        assert_eq!(VectorStore::load(&dir).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_load_missing_files() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            VectorStore::load(dir.path()).await,
            Err(IndexError::NotFound(_))
        ));

        std::fs::write(
            dir.path().join(META_FILE),
            r#"{"db_type":"flat","index_type":"ndarray"}"#,
        )
        .unwrap();
        assert!(matches!(
            VectorStore::load(dir.path()).await,
            Err(IndexError::NotFound(_))
        ));
    }

    #[test]
    fn test_docs_json_shape() {
        let json = serde_json::to_value(vec![Passage::new("hello", "notes.md")]).unwrap();
        assert_eq!(json[0]["page_content"], "hello");
        assert_eq!(json[0]["metadata"]["source"], "notes.md");
        assert!(json[0]["metadata"].get("score").is_none());
    }

    #[test]
    fn test_effective_score_fallbacks() {
        let mut p = Passage::new("t", "s");
        assert_eq!(ScoredPassage { passage: p.clone(), score: None }.effective_score(), 0.0);
        assert_eq!(
            ScoredPassage { passage: p.clone(), score: Some(f32::NAN) }.effective_score(),
            0.0
        );
        p.metadata.score = Some(0.7);
        assert_eq!(ScoredPassage { passage: p, score: None }.effective_score(), 0.7);
    }

    #[test]
    fn test_stats_counts_sources() {
        let mut store = VectorStore::new(IndexKind::Flat, "/tmp/none");
        store.passages = sample().0;
        let stats = store.stats();
        assert_eq!(stats.passage_count, 3);
        assert_eq!(stats.sources, 2);
        assert_eq!(stats.dimension, None);
    }
}
