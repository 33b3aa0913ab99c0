//! AI 블로그 업데이트 수집 모듈
//!
//! Hugging Face / DeepMind 블로그 목록 페이지에서 최신 글을 고르고,
//! 각 글의 앞 두 문단을 요약으로 붙여 날짜별 텍스트 파일로 저장합니다.
//! 저장된 파일은 이후 `ingest`로 로컬 지식에 추가합니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use scraper::{Html, Selector};
use url::Url;

/// 소스당 기본 글 수
pub const DEFAULT_LIMIT: usize = 5;

/// 요약에 쓰는 문단 수
const SUMMARY_PARAGRAPHS: usize = 2;

/// 본문을 가져오지 못했을 때의 요약
pub const NO_SUMMARY: &str = "요약 없음 (원문 링크 참고)";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// ============================================================================
// Sources
// ============================================================================

/// 목록 페이지에서 글 링크를 고르는 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRule {
    /// href가 접두어로 시작
    Prefix(&'static str),
    /// href에 문자열 포함
    Contains(&'static str),
}

impl LinkRule {
    fn matches(&self, href: &str) -> bool {
        match self {
            LinkRule::Prefix(p) => href.starts_with(p),
            LinkRule::Contains(s) => href.contains(s),
        }
    }
}

/// 블로그 소스
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlogSource {
    /// 파일 이름에 쓰는 식별자
    pub slug: &'static str,
    /// 표시 이름
    pub title: &'static str,
    pub listing_url: &'static str,
    pub rule: LinkRule,
}

pub const HUGGING_FACE: BlogSource = BlogSource {
    slug: "huggingface_blog",
    title: "Hugging Face Blog",
    listing_url: "https://huggingface.co/blog",
    rule: LinkRule::Prefix("/blog/"),
};

pub const DEEPMIND: BlogSource = BlogSource {
    slug: "deepmind_blog",
    title: "DeepMind Blog",
    listing_url: "https://deepmind.google/discover/blog/",
    rule: LinkRule::Contains("/discover/blog/"),
};

pub fn default_sources() -> Vec<BlogSource> {
    vec![HUGGING_FACE, DEEPMIND]
}

/// 블로그 글 요약
#[derive(Debug, Clone, PartialEq)]
pub struct BlogPost {
    pub title: String,
    pub link: String,
    pub summary: String,
}

// ============================================================================
// Parsing
// ============================================================================

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 목록 페이지에서 (제목, 절대 링크) 추출
///
/// 제목이 빈 링크는 버리고, 같은 링크는 처음 것만 남깁니다.
pub fn parse_listing(html: &str, source: &BlogSource, limit: usize) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let (Ok(anchor), Ok(base)) = (Selector::parse("a[href]"), Url::parse(source.listing_url))
    else {
        return Vec::new();
    };

    let mut items: Vec<(String, String)> = Vec::new();

    for element in document.select(&anchor) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !source.rule.matches(href) {
            continue;
        }

        let title = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        if title.is_empty() {
            continue;
        }

        let link = match base.join(href) {
            Ok(u) => u.to_string(),
            Err(_) => continue,
        };

        if items.iter().any(|(_, l)| l == &link) {
            continue;
        }
        items.push((title, link));

        if items.len() >= limit {
            break;
        }
    }

    items
}

/// 글 본문에서 비어 있지 않은 앞 두 문단
pub fn extract_summary(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("p").ok()?;

    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|p| collapse_whitespace(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
        .take(SUMMARY_PARAGRAPHS)
        .collect();

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n"))
    }
}

/// 저장 파일 내용
pub fn render_digest(source: &BlogSource, posts: &[BlogPost], date: NaiveDate) -> String {
    let mut lines = vec![
        format!("{} 최신 글 {}개 ({})", source.title, posts.len(), date),
        String::new(),
    ];

    for (i, post) in posts.iter().enumerate() {
        lines.push(format!("### {}. {}", i + 1, post.title));
        lines.push(format!("링크: {}", post.link));
        lines.push(format!("요약: {}", post.summary));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// `2026-01-31_huggingface_blog.txt` 형식
pub fn digest_file_name(source: &BlogSource, date: NaiveDate) -> String {
    format!("{}_{}.txt", date, source.slug)
}

// ============================================================================
// Fetcher
// ============================================================================

/// 블로그 업데이트 수집기
pub struct BlogFetcher {
    client: reqwest::Client,
    limit: usize,
}

impl BlogFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .context("HTTP 클라이언트 생성 실패")?;

        Ok(Self {
            client,
            limit: DEFAULT_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("HTTP 요청 실패: {}", url))?
            .error_for_status()
            .with_context(|| format!("HTTP 오류 응답: {}", url))?;

        response.text().await.context("응답 본문 읽기 실패")
    }

    /// 글 하나의 요약 (실패 시 기본 문구)
    async fn fetch_summary(&self, link: &str) -> String {
        match self.get_text(link).await {
            Ok(html) => extract_summary(&html).unwrap_or_else(|| NO_SUMMARY.to_string()),
            Err(e) => {
                tracing::warn!("Failed to fetch article {}: {:#}", link, e);
                NO_SUMMARY.to_string()
            }
        }
    }

    /// 소스 하나의 최신 글 목록
    ///
    /// 목록 페이지 실패는 Err, 개별 글 실패는 기본 요약으로 대체합니다.
    /// 글 본문은 동시에 요청하며 결과 순서는 목록 순서와 같습니다.
    pub async fn fetch_source(&self, source: &BlogSource) -> Result<Vec<BlogPost>> {
        tracing::info!("Fetching {}", source.listing_url);
        let html = self.get_text(source.listing_url).await?;
        let items = parse_listing(&html, source, self.limit);

        let summaries = join_all(items.iter().map(|(_, link)| self.fetch_summary(link))).await;

        Ok(items
            .into_iter()
            .zip(summaries)
            .map(|((title, link), summary)| BlogPost {
                title,
                link,
                summary,
            })
            .collect())
    }

    /// 모든 소스를 수집해 `dir`에 저장하고 저장된 파일 경로 반환
    pub async fn fetch_and_save(&self, sources: &[BlogSource], dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;

        let today = chrono::Local::now().date_naive();
        let mut written = Vec::new();

        for source in sources {
            let posts = match self.fetch_source(source).await {
                Ok(posts) => posts,
                Err(e) => {
                    tracing::warn!("{} 수집 실패: {:#}", source.title, e);
                    continue;
                }
            };

            let path = dir.join(digest_file_name(source, today));
            tokio::fs::write(&path, render_digest(source, &posts, today))
                .await
                .with_context(|| format!("Failed to write {:?}", path))?;

            tracing::info!("Saved {} posts to {:?}", posts.len(), path);
            written.push(path);
        }

        Ok(written)
    }
}

// ============================================================================
// Tests
// ============================================================================
