//! 콘텐츠 추출 모듈
//!
//! 수집된 파일에서 텍스트를 읽어 `SourceDocument`로 만듭니다.
//! - 마크다운 / 텍스트: 직접 읽기 (UTF-8)
//! - PDF: pdf-extract로 텍스트 추출
//!
//! 읽을 수 없거나 내용이 빈 파일은 경고를 남기고 건너뜁니다.

pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};

use crate::collector::{CollectedFile, FileType};

// ============================================================================
// Source Document
// ============================================================================

/// 추출된 원문 문서
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// 문서 전체 텍스트
    pub text: String,
    /// 원본 파일 경로 (출처 표시용)
    pub source: String,
}

impl SourceDocument {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

// ============================================================================
// Content Extractor
// ============================================================================

/// 콘텐츠 추출기
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 파일 하나에서 문서 추출
    ///
    /// 읽기 실패는 Err, 공백뿐인 내용은 Ok(None)
    pub async fn extract(&self, file: &CollectedFile) -> Result<Option<SourceDocument>> {
        let text = match file.file_type {
            FileType::Markdown | FileType::Text => read_text(&file.path).await?,
            FileType::Pdf => {
                let path = file.path.clone();
                tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&path))
                    .await
                    .context("PDF extraction task panicked")??
            }
        };

        if text.trim().is_empty() {
            tracing::warn!("Empty document, skipping: {:?}", file.path);
            return Ok(None);
        }

        Ok(Some(SourceDocument::new(
            text,
            file.path.to_string_lossy().into_owned(),
        )))
    }

    /// 여러 파일 추출 (실패한 파일은 건너뜀, 입력 순서 유지)
    pub async fn extract_all(&self, files: &[CollectedFile]) -> Vec<SourceDocument> {
        let mut documents = Vec::with_capacity(files.len());

        for file in files {
            match self.extract(file).await {
                Ok(Some(doc)) => documents.push(doc),
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to load {:?}: {:#}", file.path, e),
            }
        }

        tracing::info!("Loaded {}/{} documents", documents.len(), files.len());
        documents
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read text file: {:?}", path))
}

// ============================================================================
// Tests
// ============================================================================
