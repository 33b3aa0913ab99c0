//! Text Chunking Module
//!
//! 재귀 문자 분할기를 제공합니다.
//! 문단 → 줄 → 문장 순서로 경계를 찾고, 그래도 긴 조각은 문자 단위로 자릅니다.
//! 인접 청크는 `chunk_overlap` 문자만큼 겹쳐서 경계 문맥을 보존합니다.

use std::collections::VecDeque;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정 (크기 단위: 문자 수)
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkConfig {
    /// 최대 청크 크기
    pub chunk_size: usize,
    /// 인접 청크 간 오버랩
    pub chunk_overlap: usize,
    /// 우선순위 순 분할 경계
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 120,
            separators: vec!["\n\n".to_string(), "\n".to_string(), ". ".to_string()],
        }
    }
}

impl ChunkConfig {
    /// 크기/오버랩만 지정 (기본 경계 사용)
    pub fn with_size(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// RecursiveChunker
// ============================================================================

/// 재귀 문자 분할 청커
pub struct RecursiveChunker {
    config: ChunkConfig,
}

impl RecursiveChunker {
    /// 설정으로 생성
    ///
    /// 오버랩이 청크 크기 이상이면 `chunk_size - 1`로 줄입니다.
    pub fn new(mut config: ChunkConfig) -> Self {
        config.chunk_size = config.chunk_size.max(1);
        if config.chunk_overlap >= config.chunk_size {
            tracing::warn!(
                "chunk_overlap ({}) >= chunk_size ({}), clamping",
                config.chunk_overlap,
                config.chunk_size
            );
            config.chunk_overlap = config.chunk_size - 1;
        }
        Self { config }
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// 설정 참조
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 경계 목록을 순서대로 시도하며 분할
    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // 텍스트에 실제로 존재하는 첫 경계 선택, 없으면 문자 단위
        let position = separators
            .iter()
            .position(|sep| !sep.is_empty() && text.contains(sep.as_str()));

        let (separator, remaining): (&str, &[String]) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &[]),
        };

        let pieces: Vec<&str> = if separator.is_empty() {
            split_chars(text)
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) <= self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            // 긴 조각: 쌓인 것 먼저 병합하고 다음 경계로 재귀
            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, separator));
                pending.clear();
            }

            chunks.extend(self.split_recursive(piece, remaining));
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, separator));
        }

        chunks
    }

    /// 작은 조각을 최대 크기까지 합치면서 오버랩 유지
    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &split in splits {
            let len = char_len(split);
            let joined_extra = if current.is_empty() { 0 } else { sep_len };

            if !current.is_empty() && total + len + joined_extra > size {
                push_joined(&mut docs, &current, separator);

                // 오버랩 크기 이하가 될 때까지 앞에서 제거
                while !current.is_empty() {
                    if total > overlap || total + len + sep_len > size {
                        let first_len = current.front().map(|s| char_len(s)).unwrap_or(0);
                        let first_sep = if current.len() > 1 { sep_len } else { 0 };
                        total = total.saturating_sub(first_len + first_sep);
                        current.pop_front();
                    } else {
                        break;
                    }
                }
            }

            if !current.is_empty() {
                total += sep_len;
            }
            total += len;
            current.push_back(split);
        }

        push_joined(&mut docs, &current, separator);
        docs
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        self.split_recursive(text, &self.config.separators)
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect()
    }

    fn name(&self) -> &'static str {
        "RecursiveChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 문자 수 (바이트 수가 아님)
#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 문자 단위 분할 (UTF-8 경계 안전)
fn split_chars(text: &str) -> Vec<&str> {
    text.char_indices()
        .map(|(i, c)| &text[i..i + c.len_utf8()])
        .collect()
}

/// 조각을 경계로 이어 붙여 추가 (앞뒤 공백 제거, 빈 청크 무시)
fn push_joined(docs: &mut Vec<String>, parts: &VecDeque<&str>, separator: &str) {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::with_defaults())
}

/// 설정을 지정한 청커 생성
pub fn recursive_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> RecursiveChunker {
        RecursiveChunker::new(ChunkConfig::with_size(size, overlap))
    }

    #[test]
    fn test_chunker_empty() {
        let chunks = RecursiveChunker::with_defaults().chunk("   \n\n ");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunker_small_text() {
        let chunks = RecursiveChunker::with_defaults().chunk("# Header\n\nShort paragraph.");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Header"));
        assert!(chunks[0].contains("Short paragraph."));
    }

    #[test]
    fn test_hard_cut_with_overlap() {
        let chunks = chunker(4, 1).chunk("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_hard_cut_without_overlap() {
        let chunks = chunker(4, 0).chunk("abcdefgh");
        assert_eq!(chunks, vec!["abcd", "efgh"]);
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let text = "first paragraph here\n\nsecond paragraph here\n\nthird paragraph here";
        let chunks = chunker(45, 0).chunk(text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "first paragraph here\n\nsecond paragraph here");
        assert_eq!(chunks[1], "third paragraph here");
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let sentence = "Retrieval augmented generation grounds answers in documents. ";
        let text = sentence.repeat(40);
        let chunks = chunker(200, 60).chunk(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200, "chunk too long: {}", chunk.len());
        }

        // 다음 청크의 첫 문장은 이전 청크 끝에도 있음
        for pair in chunks.windows(2) {
            assert!(pair[0].contains(&pair[1][..20]));
        }
    }

    #[test]
    fn test_multibyte_text_is_safe() {
        let text = "검색증강생성은문서에근거한답변을만든다".repeat(10);
        let chunks = chunker(30, 5).chunk(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
        }
    }

    #[test]
    fn test_overlap_clamped() {
        let c = chunker(10, 50);
        assert_eq!(c.config().chunk_overlap, 9);
    }

    #[test]
    fn test_config_defaults() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 120);
        assert_eq!(config.separators, vec!["\n\n", "\n", ". "]);
    }
}
