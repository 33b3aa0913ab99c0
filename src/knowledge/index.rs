//! Vector Index - 벡터 인덱스 트레이트 및 유틸리티
//!
//! 두 백엔드가 같은 계약을 구현합니다.
//! - `Flat`: 메모리 행렬 + 전수 내적 검색, `index.npy`로 저장
//! - `Lance`: LanceDB 테이블, `index.lance/`로 저장
//!
//! 모든 벡터는 build/search 양쪽에서 L2 정규화되므로 내적 = 코사인 유사도입니다.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;

use super::flat::FlatIndex;
use super::lance::LanceIndex;
use crate::error::{IndexError, IndexResult};

// ============================================================================
// Types
// ============================================================================

/// 검색 히트 (패시지 위치 + 유사도)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// 패시지 목록 내 인덱스
    pub id: usize,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub score: f32,
}

/// 인덱스 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// 메모리 행렬 전수 검색
    Flat,
    /// LanceDB
    Lance,
}

impl IndexKind {
    /// meta.json `db_type` 값
    pub fn db_type(self) -> &'static str {
        match self {
            IndexKind::Flat => "flat",
            IndexKind::Lance => "lance",
        }
    }

    /// meta.json `index_type` 값
    pub fn index_type(self) -> &'static str {
        match self {
            IndexKind::Flat => "ndarray",
            IndexKind::Lance => "lance",
        }
    }

    /// meta.json `index_type`에서 복원
    pub fn from_index_type(value: &str) -> Option<Self> {
        match value {
            "ndarray" => Some(IndexKind::Flat),
            "lance" => Some(IndexKind::Lance),
            _ => None,
        }
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lance" | "lancedb" | "native" | "faiss" => Ok(IndexKind::Lance),
            "flat" | "ndarray" | "numpy" | "memory" => Ok(IndexKind::Flat),
            other => Err(format!("unknown vector backend: {}", other)),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.db_type())
    }
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 벡터 인덱스 트레이트 (async)
///
/// 생성은 백엔드별 `build`/`load`가 담당하고, 만들어진 인덱스는 읽기 전용입니다.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// 백엔드 종류
    fn kind(&self) -> IndexKind;

    /// 저장된 벡터 수
    fn len(&self) -> usize;

    /// 비어있는지 여부
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 벡터 차원
    fn dimension(&self) -> usize;

    /// 유사도 내림차순 top-k 검색 (빈 인덱스면 빈 결과)
    async fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Hit>>;

    /// 디렉토리에 백엔드별 인덱스 파일 저장
    async fn persist(&self, dir: &Path) -> IndexResult<()>;
}

/// 새 인덱스 생성
///
/// # Arguments
/// * `kind` - 백엔드 종류
/// * `workdir` - 백엔드 작업 디렉토리 (LanceDB 테이블 위치)
/// * `vectors` - 패시지 순서와 같은 순서의 임베딩
pub async fn build_index(
    kind: IndexKind,
    workdir: &Path,
    vectors: &[Vec<f32>],
) -> IndexResult<Box<dyn VectorIndex>> {
    let index: Box<dyn VectorIndex> = match kind {
        IndexKind::Flat => Box::new(FlatIndex::build(vectors)?),
        IndexKind::Lance => {
            Box::new(LanceIndex::build(&workdir.join(LanceIndex::DIR_NAME), vectors).await?)
        }
    };
    Ok(index)
}

/// 저장된 인덱스 로드
pub async fn load_index(kind: IndexKind, dir: &Path) -> IndexResult<Box<dyn VectorIndex>> {
    let index: Box<dyn VectorIndex> = match kind {
        IndexKind::Flat => Box::new(FlatIndex::load(dir)?),
        IndexKind::Lance => Box::new(LanceIndex::open(&dir.join(LanceIndex::DIR_NAME)).await?),
    };
    Ok(index)
}

// ============================================================================
// Utility Functions
// ============================================================================

/// L2 정규화된 복사본 (영벡터는 그대로)
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// 벡터 목록의 공통 차원 확인
pub fn common_dimension(vectors: &[Vec<f32>]) -> IndexResult<usize> {
    let first = vectors.first().ok_or(IndexError::EmptyInput)?;
    let dim = first.len();
    if dim == 0 {
        return Err(IndexError::DimensionMismatch {
            expected: 1,
            actual: 0,
        });
    }

    for v in vectors {
        if v.len() != dim {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: v.len(),
            });
        }
    }

    Ok(dim)
}

/// 유사도 내림차순 정렬 후 k개로 자르기 (동점은 id 오름차순)
pub fn rank_hits(mut hits: Vec<Hit>, k: usize) -> Vec<Hit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    hits.truncate(k);
    hits
}

// ============================================================================
// Tests
// ============================================================================
