//! 로컬 충분성 판정
//!
//! 검색 결과만으로 답변할 수 있는지 결정하는 순수 함수입니다.
//! 외부 호출이나 환경변수 조회가 없으므로 같은 입력에는 항상 같은 결과가 나옵니다.

use crate::config::Thresholds;

use super::keywords::{contains_any, KeywordExtractor};
use super::store::ScoredPassage;

/// 키워드 커버리지를 확인할 상위 결과 수
pub const KEYWORD_WINDOW: usize = 8;

/// 판정 결과 (로그/디버그용 근거 포함)
#[derive(Debug, Clone, PartialEq)]
pub struct SufficiencyVerdict {
    pub is_sufficient: bool,
    /// 유사도가 `sim_tau` 이상인 결과 수
    pub good_count: usize,
    /// `good_count / max(결과 수, 1)`
    pub proportion: f32,
    /// 상위 `KEYWORD_WINDOW`개 중 키워드를 포함한 결과 수
    pub keyword_hits: usize,
    /// 질의에서 추출한 키워드
    pub keywords: Vec<String>,
}

/// 로컬 결과가 충분한지 판정
///
/// 조건 (모두 만족해야 충분):
/// - `good_count >= min_good`
/// - `proportion >= min_prop`
/// - 키워드가 하나라도 맞거나 질의에서 키워드가 추출되지 않음
///
/// 결과가 비어 있으면 항상 불충분입니다.
pub fn decide(
    query: &str,
    results: &[ScoredPassage],
    thresholds: &Thresholds,
    extractor: &dyn KeywordExtractor,
) -> SufficiencyVerdict {
    let keywords = extractor.extract(query);

    if results.is_empty() {
        return SufficiencyVerdict {
            is_sufficient: false,
            good_count: 0,
            proportion: 0.0,
            keyword_hits: 0,
            keywords,
        };
    }

    let good_count = results
        .iter()
        .filter(|r| r.effective_score() >= thresholds.sim_tau)
        .count();
    let proportion = good_count as f32 / results.len().max(1) as f32;

    let keyword_hits = results
        .iter()
        .take(KEYWORD_WINDOW)
        .filter(|r| contains_any(&r.passage.text, &keywords))
        .count();

    let keywords_ok = keywords.is_empty() || keyword_hits > 0;
    let is_sufficient =
        good_count >= thresholds.min_good && proportion >= thresholds.min_prop && keywords_ok;

    SufficiencyVerdict {
        is_sufficient,
        good_count,
        proportion,
        keyword_hits,
        keywords,
    }
}

/// 결과 점수 요약 (최댓값, 중앙값)
pub fn score_summary(results: &[ScoredPassage]) -> (f32, f32) {
    if results.is_empty() {
        return (0.0, 0.0);
    }

    let mut scores: Vec<f32> = results.iter().map(|r| r.effective_score()).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let max = scores[scores.len() - 1];
    let mid = scores.len() / 2;
    let median = if scores.len() % 2 == 0 {
        (scores[mid - 1] + scores[mid]) / 2.0
    } else {
        scores[mid]
    };

    (max, median)
}

// ============================================================================
// Tests
// ============================================================================
