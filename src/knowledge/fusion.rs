//! 컨텍스트 융합 및 답변 프롬프트
//!
//! 웹 요약 블록(선택)과 로컬 패시지 블록(선택)을 하나의 컨텍스트로 합치고,
//! 출처 목록으로 끝나는 답변을 요구하는 프롬프트를 만듭니다.

use crate::session::{Message, Role};
use crate::tools::Language;

use super::store::ScoredPassage;

/// 컨텍스트가 전혀 없을 때의 표시
pub const NO_MATERIAL: &str = "(자료 없음)";

/// 답변 끝 출처 목록 제목
pub const SOURCES_HEADING: &str = "참고 출처:";

/// 사용한 출처가 없을 때의 표시
pub const NONE_MARKER: &str = "(없음)";

/// 프롬프트에 넣을 최근 대화 수
const HISTORY_TURNS: usize = 6;

// ============================================================================
// Evidence
// ============================================================================

/// 웹 검색 요약 (번역 후)
#[derive(Debug, Clone, PartialEq)]
pub struct WebEvidence {
    pub query: String,
    pub summary: String,
}

impl WebEvidence {
    pub fn new(query: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            summary: summary.into(),
        }
    }

    /// 제목 + 링크 + 요약 블록
    pub fn render(&self) -> String {
        format!(
            "### 웹 검색 요약: {}\n링크: 없음 (DuckDuckGo 요약)\n요약: {}\n",
            self.query, self.summary
        )
    }

    /// 출처 목록용 라벨
    pub fn label(&self) -> String {
        format!("웹 검색: {} (DuckDuckGo)", self.query)
    }
}

/// 융합된 컨텍스트 (웹 블록 → 로컬 블록 순서)
#[derive(Debug, Clone, Default)]
pub struct FusedContext {
    pub web: Option<WebEvidence>,
    pub local: Vec<ScoredPassage>,
}

impl FusedContext {
    pub fn new(web: Option<WebEvidence>, local: Vec<ScoredPassage>) -> Self {
        Self { web, local }
    }

    /// 로컬 패시지만 사용
    pub fn local_only(local: Vec<ScoredPassage>) -> Self {
        Self { web: None, local }
    }

    pub fn is_empty(&self) -> bool {
        self.web.is_none() && self.local.is_empty()
    }

    /// 프롬프트용 텍스트
    ///
    /// 블록은 빈 줄로 구분하고, 둘 다 없으면 `NO_MATERIAL`을 반환합니다.
    pub fn render(&self) -> String {
        let mut blocks = Vec::new();

        if let Some(web) = &self.web {
            blocks.push(format!("[웹 검색 결과]\n{}", web.render()));
        }

        if !self.local.is_empty() {
            let items: Vec<String> = self
                .local
                .iter()
                .enumerate()
                .map(|(i, r)| format!("[{}] 출처: {}\n{}", i + 1, r.passage.source(), r.passage.text))
                .collect();
            blocks.push(format!("[로컬 자료]\n{}", items.join("\n\n")));
        }

        if blocks.is_empty() {
            NO_MATERIAL.to_string()
        } else {
            blocks.join("\n\n")
        }
    }

    /// 출처 라벨 (웹 먼저, 로컬 출처는 중복 제거)
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if let Some(web) = &self.web {
            labels.push(web.label());
        }
        labels.extend(source_list(&self.local));
        labels
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// 시스템/사용자 프롬프트 쌍
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// 하이브리드(로컬 + 웹) 답변 프롬프트
pub fn hybrid_prompt(
    query: &str,
    context: &FusedContext,
    history: &[Message],
    lang: Language,
) -> Prompt {
    let system = format!(
        "당신은 검색 증강 질의응답 도우미입니다.\n\
         제공된 자료에 근거해서만 답하고, 자료를 지어내지 마세요.\n\
         답변 끝에는 반드시 \"{heading}\" 단락을 두고 사용한 로컬/웹 자료를 모두 나열하세요.\n\
         자료에 관련 내용이 없으면 \"자료에 관련 내용이 없습니다\"라고 분명히 말하고 추측하지 마세요.\n\
         답변은 {lang}로 작성하세요.",
        heading = SOURCES_HEADING,
        lang = lang.display_name(),
    );

    let mut user = String::new();

    let recent = recent_history(history);
    if !recent.is_empty() {
        user.push_str("이전 대화:\n");
        user.push_str(&recent);
        user.push_str("\n\n");
    }

    user.push_str(&format!(
        "사용자 질문: {query}\n\n\
         사용할 수 있는 자료:\n{context}\n\n\
         먼저 간결하게 답한 뒤, 줄을 바꿔 다음을 쓰세요:\n\
         {heading}\n\
         - 위에서 사용한 자료의 제목/파일명/URL\n\
         - 자료가 하나뿐이면 하나만\n\
         - 자료가 전혀 없으면 \"{none}\"\n",
        query = query,
        context = context.render(),
        heading = SOURCES_HEADING,
        none = NONE_MARKER,
    ));

    Prompt { system, user }
}

/// 로컬 전용 답변 프롬프트
pub fn local_prompt(query: &str, context: &FusedContext, lang: Language) -> Prompt {
    let system = format!(
        "당신은 신중한 지식 도우미입니다. 주로 \"컨텍스트\"에 근거해 답하세요.\n\
         컨텍스트가 부족하면 부족하다고 말하고 지어내지 마세요.\n\
         답변은 {}로 작성하세요.",
        lang.display_name()
    );
    let user = format!("질문: {}\n\n컨텍스트:\n{}", query, context.render());

    Prompt { system, user }
}

// ============================================================================
// Sources
// ============================================================================

/// 검색 결과의 출처 목록 (순서 유지, 중복 제거)
pub fn source_list(results: &[ScoredPassage]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for r in results {
        let source = r.passage.source();
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }
    sources
}

/// 출처 단락 텍스트
pub fn format_sources(labels: &[String]) -> String {
    let mut out = String::from(SOURCES_HEADING);
    if labels.is_empty() {
        out.push_str(&format!("\n- {}", NONE_MARKER));
    } else {
        for label in labels {
            out.push_str(&format!("\n- {}", label));
        }
    }
    out
}

/// 답변이 출처 목록으로 끝나지 않으면 덧붙임
pub fn ensure_sources(answer: &str, labels: &[String]) -> String {
    let trimmed = answer.trim_end();
    if ends_with_source_list(trimmed) {
        return trimmed.to_string();
    }
    format!("{}\n\n{}", trimmed, format_sources(labels))
}

/// 마지막 `참고 출처:` 제목이 줄 맨 앞에 있고, 그 뒤 끝까지 비어 있지 않은
/// `- ` 항목 줄만 하나 이상 이어지는지
fn ends_with_source_list(answer: &str) -> bool {
    let Some(pos) = answer.rfind(SOURCES_HEADING) else {
        return false;
    };

    let line_start = answer[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if !answer[line_start..pos].trim().is_empty() {
        return false;
    }

    let mut items = answer[pos + SOURCES_HEADING.len()..]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();

    items.peek().is_some()
        && items.all(|line| {
            line.strip_prefix('-')
                .map(|rest| !rest.trim().is_empty())
                .unwrap_or(false)
        })
}

/// 최근 대화를 "역할: 내용" 줄로
fn recent_history(history: &[Message]) -> String {
    let start = history.len().saturating_sub(HISTORY_TURNS);
    history[start..]
        .iter()
        .map(|m| {
            let who = match m.role {
                Role::User => "사용자",
                Role::Assistant => "도우미",
            };
            format!("{}: {}", who, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::store::Passage;

    fn local() -> Vec<ScoredPassage> {
        vec![
            ScoredPassage::new(Passage::new("Attention weights tokens.", "notes/a.md"), 0.9),
            ScoredPassage::new(Passage::new("Layers stack.", "notes/b.md"), 0.7),
            ScoredPassage::new(Passage::new("More attention.", "notes/a.md"), 0.6),
        ]
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(FusedContext::default().render(), NO_MATERIAL);
    }

    #[test]
    fn test_render_web_before_local() {
        let ctx = FusedContext::new(Some(WebEvidence::new("RAG", "검색 증강 생성")), local());
        let text = ctx.render();

        let web_pos = text.find("### 웹 검색 요약: RAG").unwrap();
        let local_pos = text.find("[1] 출처: notes/a.md").unwrap();
        assert!(web_pos < local_pos);
        assert!(text.contains("[2] 출처: notes/b.md\nLayers stack."));
        assert!(text.contains("요약: 검색 증강 생성"));
        assert!(!text.contains(NO_MATERIAL));
    }

    #[test]
    fn test_render_local_only() {
        let text = FusedContext::local_only(local()).render();
        assert!(text.starts_with("[로컬 자료]"));
        assert!(!text.contains("웹 검색"));
    }

    #[test]
    fn test_labels_dedup() {
        let ctx = FusedContext::new(Some(WebEvidence::new("q", "s")), local());
        assert_eq!(
            ctx.labels(),
            vec!["웹 검색: q (DuckDuckGo)", "notes/a.md", "notes/b.md"]
        );
    }

    #[test]
    fn test_ensure_sources_appends() {
        let out = ensure_sources("답변입니다.", &["notes/a.md".to_string()]);
        assert!(out.ends_with("참고 출처:\n- notes/a.md"));

        let none = ensure_sources("답변입니다.\n", &[]);
        assert!(none.ends_with("참고 출처:\n- (없음)"));
    }

    #[test]
    fn test_ensure_sources_keeps_model_list() {
        let answer = "답변.\n\n참고 출처:\n- notes/a.md\n- 웹 검색: RAG (DuckDuckGo)";
        assert_eq!(ensure_sources(answer, &["other".to_string()]), answer);
    }

    #[test]
    fn test_ensure_sources_phrase_mid_sentence() {
        let out = ensure_sources(
            "참고 출처는 아래 자료입니다. 답변: 42",
            &["notes/a.md".to_string()],
        );
        assert_eq!(
            out,
            "참고 출처는 아래 자료입니다. 답변: 42\n\n참고 출처:\n- notes/a.md"
        );
    }

    #[test]
    fn test_ensure_sources_empty_heading() {
        let out = ensure_sources("답변입니다.\n\n참고 출처:\n", &[]);
        assert!(out.ends_with("참고 출처:\n- (없음)"));

        let out = ensure_sources("답변입니다.\n참고 출처:\n-  \n", &["notes/a.md".to_string()]);
        assert!(out.ends_with("\n\n참고 출처:\n- notes/a.md"));
    }

    #[test]
    fn test_ensure_sources_text_after_list() {
        let answer = "참고 출처:\n- notes/a.md\n\n추가 설명이 이어집니다.";
        let out = ensure_sources(answer, &["notes/a.md".to_string()]);
        assert!(out.ends_with("추가 설명이 이어집니다.\n\n참고 출처:\n- notes/a.md"));
    }

    #[test]
    fn test_hybrid_prompt_contents() {
        let history = vec![Message::user("안녕"), Message::assistant("안녕하세요")];
        let ctx = FusedContext::local_only(local());
        let prompt = hybrid_prompt("어텐션이란?", &ctx, &history, Language::Korean);

        assert!(prompt.system.contains(SOURCES_HEADING));
        assert!(prompt.system.contains("한국어"));
        assert!(prompt.user.contains("이전 대화:\n사용자: 안녕\n도우미: 안녕하세요"));
        assert!(prompt.user.contains("사용자 질문: 어텐션이란?"));
        assert!(prompt.user.contains(NONE_MARKER));
    }

    #[test]
    fn test_prompt_without_material() {
        let prompt = hybrid_prompt("q", &FusedContext::default(), &[], Language::English);
        assert!(prompt.user.contains(NO_MATERIAL));
        assert!(!prompt.user.contains("이전 대화"));

        let local = local_prompt("q", &FusedContext::default(), Language::Korean);
        assert!(local.user.ends_with(NO_MATERIAL));
    }
}
