//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트로 전체 텍스트를 뽑고 페이지 단위로 정리합니다.

use std::path::Path;

use anyhow::{Context, Result};

/// PDF에서 텍스트 추출
///
/// 페이지(폼피드 구분)별로 앞뒤 공백을 정리한 뒤 줄바꿈으로 이어 붙입니다.
/// 스캔 문서처럼 텍스트 레이어가 없으면 빈 문자열을 반환합니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let raw = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    let pages = split_pages(&raw);
    tracing::debug!("PDF {:?}: {} pages with text", path, pages.len());

    if pages.is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(String::new());
    }

    Ok(collapse_blank_lines(&pages.join("\n")))
}

/// 폼피드 문자(\x0c)로 페이지 분리 (빈 페이지 제외)
fn split_pages(text: &str) -> Vec<String> {
    text.split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 세 줄 이상 연속된 빈 줄을 문단 구분 하나로
fn collapse_blank_lines(text: &str) -> String {
    match regex::Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+") {
        Ok(re) => re.replace_all(text, "\n\n").into_owned(),
        Err(_) => text.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_pages_with_formfeed() {
        let pages = split_pages("Page 1 content\x0c  \x0cPage 2 content\x0c");
        assert_eq!(pages, vec!["Page 1 content", "Page 2 content"]);
    }

    #[test]
    fn test_split_pages_no_separator() {
        assert_eq!(split_pages("Just text").len(), 1);
        assert!(split_pages("  \n ").is_empty());
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
        assert_eq!(collapse_blank_lines("a\n \n\t\nb"), "a\n\nb");
    }

    #[test]
    fn test_corrupt_pdf_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();
        assert!(extract_text_from_pdf(&path).is_err());
    }
}
