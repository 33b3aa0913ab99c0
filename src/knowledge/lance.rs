//! LanceDB Vector Index - 디스크 기반 벡터 검색
//!
//! 패시지 위치(`passage_id`)와 정규화된 임베딩만 저장합니다.
//! 텍스트는 `docs.json`에 있으므로 테이블에 중복 저장하지 않습니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::CreateTableMode;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::table::Table;
use lancedb::DistanceType;
use walkdir::WalkDir;

use super::index::{common_dimension, normalized, rank_hits, Hit, IndexKind, VectorIndex};
use crate::error::{IndexError, IndexResult};

/// 벡터 테이블 이름
const TABLE_NAME: &str = "passages";

// ============================================================================
// LanceIndex
// ============================================================================

/// LanceDB 벡터 인덱스
pub struct LanceIndex {
    /// `.lance` 디렉토리
    path: PathBuf,
    table: Table,
    rows: usize,
    dimension: usize,
}

impl LanceIndex {
    /// 인덱스 디렉토리 안의 LanceDB 디렉토리 이름
    pub const DIR_NAME: &'static str = "index.lance";

    /// 새 테이블 생성 (같은 위치의 기존 테이블은 덮어씀)
    ///
    /// # Arguments
    /// * `path` - .lance 디렉토리 경로
    /// * `vectors` - 패시지 순서의 임베딩
    pub async fn build(path: &Path, vectors: &[Vec<f32>]) -> IndexResult<Self> {
        let dimension = common_dimension(vectors)?;
        let db = connect(path, true).await?;

        let batch = Self::vectors_to_batch(vectors, dimension)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let table = db
            .create_table(TABLE_NAME, batches)
            .mode(CreateTableMode::Overwrite)
            .execute()
            .await?;

        tracing::debug!("Built LanceDB table: {} rows at {:?}", vectors.len(), path);

        Ok(Self {
            path: path.to_path_buf(),
            table,
            rows: vectors.len(),
            dimension,
        })
    }

    /// 기존 테이블 열기
    pub async fn open(path: &Path) -> IndexResult<Self> {
        if !path.exists() {
            return Err(IndexError::NotFound(path.to_path_buf()));
        }

        let db = connect(path, false).await?;
        let names = db.table_names().execute().await?;
        if !names.iter().any(|n| n == TABLE_NAME) {
            return Err(IndexError::NotFound(path.join(TABLE_NAME)));
        }

        let table = db.open_table(TABLE_NAME).execute().await?;
        let rows = table.count_rows(None).await?;
        let schema = table.schema().await?;

        let dimension = match schema.field_with_name("embedding")?.data_type() {
            DataType::FixedSizeList(_, size) => *size as usize,
            other => {
                return Err(IndexError::Backend(format!(
                    "unexpected embedding column type: {}",
                    other
                )))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            table,
            rows,
            dimension,
        })
    }

    /// 벡터 테이블 스키마 생성
    fn create_schema(dimension: i32) -> Schema {
        Schema::new(vec![
            Field::new("passage_id", DataType::Int64, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension,
                ),
                false,
            ),
        ])
    }

    /// 벡터들을 Arrow RecordBatch로 변환 (정규화 포함)
    fn vectors_to_batch(vectors: &[Vec<f32>], dimension: usize) -> IndexResult<RecordBatch> {
        let dim = i32::try_from(dimension)
            .map_err(|_| IndexError::Backend(format!("dimension too large: {}", dimension)))?;

        let ids: Vec<i64> = (0..vectors.len() as i64).collect();
        let flat: Vec<f32> = vectors.iter().flat_map(|v| normalized(v)).collect();

        let values = Float32Array::from(flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings = FixedSizeListArray::try_new(
            field,
            dim,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )?;

        let batch = RecordBatch::try_new(
            Arc::new(Self::create_schema(dim)),
            vec![Arc::new(Int64Array::from(ids)), Arc::new(embeddings)],
        )?;

        Ok(batch)
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Lance
    }

    fn len(&self) -> usize {
        self.rows
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Hit>> {
        if self.rows == 0 || k == 0 {
            return Ok(vec![]);
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let stream = self
            .table
            .vector_search(normalized(query))?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?;

        let batches: Vec<RecordBatch> = stream.try_collect().await?;

        let mut hits = Vec::new();
        for batch in batches {
            let ids = batch
                .column_by_name("passage_id")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| IndexError::Backend("missing passage_id column".to_string()))?;

            // _distance 컬럼 (LanceDB가 자동 추가), 코사인 거리 = 1 - 유사도
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| IndexError::Backend("missing _distance column".to_string()))?;

            for i in 0..batch.num_rows() {
                let id = usize::try_from(ids.value(i))
                    .map_err(|_| IndexError::Backend("negative passage_id".to_string()))?;
                hits.push(Hit {
                    id,
                    score: 1.0 - distances.value(i),
                });
            }
        }

        Ok(rank_hits(hits, k))
    }

    async fn persist(&self, dir: &Path) -> IndexResult<()> {
        let target = dir.join(Self::DIR_NAME);
        if same_location(&self.path, &target) {
            return Ok(());
        }

        if target.exists() {
            std::fs::remove_dir_all(&target)?;
        }
        copy_dir(&self.path, &target)?;

        tracing::debug!("Copied LanceDB table {:?} -> {:?}", self.path, target);
        Ok(())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// LanceDB 연결 (필요 시 부모 디렉토리 생성)
async fn connect(path: &Path, create: bool) -> IndexResult<lancedb::connection::Connection> {
    if create {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| IndexError::Backend(format!("invalid path encoding: {:?}", path)))?;

    Ok(lancedb::connect(path_str).execute().await?)
}

/// 같은 경로인지 (정규화 실패 시 문자열 비교)
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// 디렉토리 재귀 복사
fn copy_dir(from: &Path, to: &Path) -> IndexResult<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| IndexError::Backend(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| IndexError::Backend(e.to_string()))?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
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

    fn sample_vectors() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.7, 0.7, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
        ]
    }

    #[tokio::test]
    async fn test_lance_build_and_search() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(LanceIndex::DIR_NAME);

        let index = LanceIndex::build(&path, &sample_vectors()).await.unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dimension(), 4);

        let hits = index.search(&[1.0, 0.1, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 0);
        assert_eq!(hits[1].id, 2);
        assert!(hits[0].score > 0.9);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_lance_build_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(LanceIndex::DIR_NAME);

        LanceIndex::build(&path, &sample_vectors()).await.unwrap();
        let rebuilt = LanceIndex::build(&path, &sample_vectors()[..2]).await.unwrap();
        assert_eq!(rebuilt.len(), 2);

        let reopened = LanceIndex::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 2);
    }

    #[tokio::test]
    async fn test_lance_persist_elsewhere_and_open() {
        let work = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let index = LanceIndex::build(&work.path().join(LanceIndex::DIR_NAME), &sample_vectors())
            .await
            .unwrap();
        index.persist(out.path()).await.unwrap();

        let loaded = LanceIndex::open(&out.path().join(LanceIndex::DIR_NAME))
            .await
            .unwrap();
        let query = [0.2, 0.9, 0.1, 0.0];
        let before = index.search(&query, 4).await.unwrap();
        let after = loaded.search(&query, 4).await.unwrap();

        assert_eq!(
            before.iter().map(|h| h.id).collect::<Vec<_>>(),
            after.iter().map(|h| h.id).collect::<Vec<_>>()
        );
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a.score - b.score).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_lance_open_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = LanceIndex::open(&temp_dir.path().join("nothing.lance")).await;
        assert!(matches!(result, Err(IndexError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lance_dimension_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let index = LanceIndex::build(&temp_dir.path().join("t.lance"), &sample_vectors())
            .await
            .unwrap();
        let result = index.search(&[1.0, 0.0], 1).await;
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }
}
