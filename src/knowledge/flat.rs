//! Flat Index - 메모리 행렬 전수 검색
//!
//! 정규화된 벡터를 행 우선 행렬로 보관하고 질의마다 전체 내적을 계산합니다.
//! 저장 형식은 NumPy `.npy` v1.0 (`<f4`, C order, 2차원)입니다.

use std::path::Path;

use async_trait::async_trait;

use super::index::{common_dimension, normalized, rank_hits, Hit, IndexKind, VectorIndex};
use crate::error::{IndexError, IndexResult};

/// 저장 파일 이름
pub const NPY_FILE: &str = "index.npy";

/// npy 매직 바이트
const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// npy 헤더 정렬 단위
const NPY_ALIGN: usize = 64;

// ============================================================================
// FlatIndex
// ============================================================================

/// 메모리 행렬 인덱스
#[derive(Debug, Clone)]
pub struct FlatIndex {
    /// 행 우선 정규화 벡터
    matrix: Vec<f32>,
    rows: usize,
    dimension: usize,
}

impl FlatIndex {
    /// 벡터 목록으로 생성 (정규화 포함)
    pub fn build(vectors: &[Vec<f32>]) -> IndexResult<Self> {
        let dimension = common_dimension(vectors)?;

        let mut matrix = Vec::with_capacity(vectors.len() * dimension);
        for v in vectors {
            matrix.extend(normalized(v));
        }

        Ok(Self {
            matrix,
            rows: vectors.len(),
            dimension,
        })
    }

    /// `dir/index.npy` 로드
    pub fn load(dir: &Path) -> IndexResult<Self> {
        let path = dir.join(NPY_FILE);
        if !path.exists() {
            return Err(IndexError::NotFound(path));
        }

        let bytes = std::fs::read(&path)?;
        let (rows, dimension, matrix) = decode_npy(&bytes)?;

        tracing::debug!("Loaded flat index: {} x {} from {:?}", rows, dimension, path);

        Ok(Self {
            matrix,
            rows,
            dimension,
        })
    }

    /// i번째 행
    fn row(&self, i: usize) -> &[f32] {
        &self.matrix[i * self.dimension..(i + 1) * self.dimension]
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Flat
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

        let q = normalized(query);
        let hits = (0..self.rows)
            .map(|id| Hit {
                id,
                score: self.row(id).iter().zip(q.iter()).map(|(a, b)| a * b).sum(),
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn persist(&self, dir: &Path) -> IndexResult<()> {
        std::fs::create_dir_all(dir)?;
        let bytes = encode_npy(self.rows, self.dimension, &self.matrix);
        std::fs::write(dir.join(NPY_FILE), bytes)?;
        Ok(())
    }
}

// ============================================================================
// NPY Encoding
// ============================================================================

/// 2차원 f32 행렬을 npy v1.0 바이트로 인코딩
fn encode_npy(rows: usize, cols: usize, data: &[f32]) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );

    // magic(6) + version(2) + header_len(2) + header + '\n' 이 64 배수가 되도록 패딩
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(NPY_MAGIC.len() + 4 + header.len() + data.len() * 4);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// npy 바이트 디코딩 → (rows, cols, data)
fn decode_npy(bytes: &[u8]) -> IndexResult<(usize, usize, Vec<f32>)> {
    let bad = |msg: &str| IndexError::Backend(format!("invalid npy file: {}", msg));

    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(bad("missing magic"));
    }

    // v1: u16 헤더 길이, v2/v3: u32
    let (header_len, header_start) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(bad("truncated header"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12)
        }
        v => return Err(bad(&format!("unsupported version {}", v))),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(bad("truncated header"));
    }

    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| bad("header is not utf-8"))?;

    if !header.contains("'descr': '<f4'") {
        return Err(bad("dtype must be <f4"));
    }
    if header.contains("'fortran_order': True") {
        return Err(bad("fortran order is not supported"));
    }

    let (rows, cols) = parse_shape(header).ok_or_else(|| bad("shape must be 2-dimensional"))?;

    let payload = &bytes[data_start..];
    if payload.len() != rows * cols * 4 {
        return Err(bad("payload size does not match shape"));
    }

    let data = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((rows, cols, data))
}

/// 헤더의 `'shape': (r, c)` 파싱
fn parse_shape(header: &str) -> Option<(usize, usize)> {
    let start = header.find("'shape':")?;
    let rest = &header[start..];
    let open = rest.find('(')?;
    let close = rest.find(')')?;

    let dims: Vec<usize> = rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect::<Option<Vec<_>>>()?;

    match dims.as_slice() {
        [rows, cols] => Some((*rows, *cols)),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
