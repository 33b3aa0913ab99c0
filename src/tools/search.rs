//! 웹 검색 도구 - DuckDuckGo (API 키 불필요)
//!
//! HTML 엔드포인트를 먼저 시도하고, 결과가 없으면 lite 엔드포인트로 다시 시도합니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// DuckDuckGo HTML 엔드포인트
const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo lite 엔드포인트 (폴백)
const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";

/// 요청 타임아웃
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Types
// ============================================================================

/// 검색 결과 항목
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// 웹 검색 트레이트
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// 검색 (결과가 없으면 빈 Vec)
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// 검색 엔진 이름
    fn name(&self) -> &str;
}

// ============================================================================
// DuckDuckGoSearch
// ============================================================================

/// DuckDuckGo 검색
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("smart-knowledge/", env!("CARGO_PKG_VERSION")))
            .timeout(SEARCH_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn fetch(&self, endpoint: &str, query: &str) -> Result<String> {
        let url = Url::parse_with_params(endpoint, &[("q", query)])
            .context("Failed to build search URL")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Search request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Search endpoint returned {}", status);
        }

        response.text().await.context("Failed to read search response")
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let first = match self.fetch(HTML_ENDPOINT, query).await {
            Ok(html) => Ok(parse_html_results(&html, max_results)),
            Err(e) => {
                tracing::warn!("DuckDuckGo html search failed: {}", e);
                Err(e)
            }
        };

        if let Ok(hits) = &first {
            if !hits.is_empty() {
                return Ok(hits.clone());
            }
        }

        tracing::debug!("Retrying search with lite endpoint: {}", query);
        match self.fetch(LITE_ENDPOINT, query).await {
            Ok(html) => Ok(parse_lite_results(&html, max_results)),
            Err(e) => {
                tracing::warn!("DuckDuckGo lite search failed: {}", e);
                // 첫 시도가 성공(빈 결과)했으면 빈 결과, 둘 다 실패면 에러
                first.map(|_| Vec::new()).map_err(|_| e)
            }
        }
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// html.duckduckgo.com 결과 파싱
fn parse_html_results(html: &str, max: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return vec![];
    };

    document
        .select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let title = element_text(&link);
            if title.is_empty() {
                return None;
            }
            let url = link.value().attr("href").map(resolve_redirect).unwrap_or_default();
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|s| element_text(&s))
                .unwrap_or_default();
            Some(SearchHit {
                title,
                snippet,
                url,
            })
        })
        .take(max)
        .collect()
}

/// lite.duckduckgo.com 결과 파싱 (링크 행과 스니펫 행이 분리된 표)
fn parse_lite_results(html: &str, max: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse("a.result-link"),
        Selector::parse("td.result-snippet"),
    ) else {
        return vec![];
    };

    let snippets: Vec<String> = document
        .select(&snippet_sel)
        .map(|s| element_text(&s))
        .collect();

    document
        .select(&link_sel)
        .enumerate()
        .filter_map(|(i, link)| {
            let title = element_text(&link);
            if title.is_empty() {
                return None;
            }
            Some(SearchHit {
                title,
                snippet: snippets.get(i).cloned().unwrap_or_default(),
                url: link.value().attr("href").map(resolve_redirect).unwrap_or_default(),
            })
        })
        .take(max)
        .collect()
}

/// 요소 텍스트 (공백 정리)
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// DuckDuckGo 리다이렉트 링크(`//duckduckgo.com/l/?uddg=...`)에서 실제 URL 추출
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    match Url::parse(&absolute) {
        Ok(url) if url.path().starts_with("/l/") => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// 검색 결과가 없을 때의 자리표시 문자열
pub fn no_results_placeholder(query: &str) -> String {
    format!("[웹 검색 결과 없음: {}]", query)
}

/// 검색 결과를 텍스트로 (빈 결과면 자리표시)
pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return no_results_placeholder(query);
    }

    hits.iter()
        .map(|h| format!("- {}\n{}\n링크: {}\n", h.title, h.snippet, h.url))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================
