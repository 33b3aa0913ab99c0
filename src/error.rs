//! 에러 타입
//!
//! 호출자가 분기해야 하는 계약 에러만 타입으로 정의합니다.
//! 나머지 애플리케이션 에러는 `anyhow`로 전파합니다.

use std::path::PathBuf;

use thiserror::Error;

/// 벡터 인덱스 에러
#[derive(Debug, Error)]
pub enum IndexError {
    /// 빈 패시지 목록으로 build 호출
    #[error("Cannot build an index from zero passages")]
    EmptyInput,

    /// 패시지/벡터 수 또는 벡터 차원 불일치
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 저장된 인덱스 파일 없음 (첫 실행이면 정상)
    #[error("No persisted vector index at {0:?}. Run `ingest` first")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 백엔드 (LanceDB, npy 포맷) 에러
    #[error("Vector backend error: {0}")]
    Backend(String),
}

impl From<lancedb::Error> for IndexError {
    fn from(err: lancedb::Error) -> Self {
        IndexError::Backend(err.to_string())
    }
}

impl From<arrow_schema::ArrowError> for IndexError {
    fn from(err: arrow_schema::ArrowError) -> Self {
        IndexError::Backend(err.to_string())
    }
}

/// 계산기 에러
///
/// 빈 입력, 허용되지 않는 문자, 평가 실패를 구분합니다.
#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("[calc] 수식을 입력해 주세요 (empty input)")]
    Empty,

    #[error("[calc] 수식에 허용되지 않는 문자가 있습니다 (illegal characters): {0:?}")]
    IllegalCharacters(char),

    #[error("[calc] 계산 오류: {0}")]
    Evaluation(String),
}

/// 인덱스 결과 타입
pub type IndexResult<T> = std::result::Result<T, IndexError>;
