//! CLI 모듈
//!
//! smart-knowledge CLI 명령어 정의 및 구현

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::KnowledgeAgent;
use crate::config::AgentConfig;
use crate::embedding::has_api_key;
use crate::knowledge::VectorStore;
use crate::scraper::{default_sources, BlogFetcher, DEFAULT_LIMIT};
use crate::session::{Message, Role, SessionStore};
use crate::tools::{calc_tool, parse_tool_args};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "smart-knowledge")]
#[command(version, about = "로컬 우선 RAG 질의응답 에이전트", long_about = None)]
pub struct Cli {
    /// 디버그 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일 또는 폴더를 읽어 로컬 인덱스 재구성 (.md, .txt, .pdf)
    Ingest {
        /// 수집할 파일/폴더 경로
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// 로컬 자료만으로 답변
    Ask {
        /// 질문
        query: String,
    },

    /// 로컬 우선, 부족하면 웹 검색으로 보강해 답변
    SmartAsk {
        /// 질문
        query: String,
    },

    /// 도구 호출 (search q=..., translate text=... target=..., calc expr=...)
    Tool {
        /// 도구 이름
        name: String,

        /// key=value 인자
        args: Vec<String>,
    },

    /// 대화형 질의응답 (세션 기록 유지)
    Chat {
        /// 세션 ID (생략 시 새로 생성)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// AI 블로그 최신 글을 samples 폴더에 저장
    FetchUpdates {
        /// 저장 폴더 (기본: 데이터 디렉토리/samples)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// 소스당 글 수
        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = AgentConfig::from_env();

    match cli.command {
        Commands::Ingest { paths } => cmd_ingest(config, paths).await,
        Commands::Ask { query } => cmd_ask(config, &query, false).await,
        Commands::SmartAsk { query } => cmd_ask(config, &query, true).await,
        Commands::Tool { name, args } => cmd_tool(config, &name, &args).await,
        Commands::Chat { session } => cmd_chat(config, session).await,
        Commands::FetchUpdates { out, limit } => cmd_fetch_updates(config, out, limit).await,
        Commands::Status => cmd_status(config).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn ensure_api_key() -> Result<()> {
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export GEMINI_API_KEY=your-api-key\n  \
             또는\n  \
             export GOOGLE_AI_API_KEY=your-api-key\n\n\
             API 키 발급: https://aistudio.google.com/app/apikey"
        );
    }
    Ok(())
}

async fn open_agent(config: AgentConfig) -> Result<KnowledgeAgent> {
    ensure_api_key()?;
    KnowledgeAgent::from_config(config)
        .await
        .context("에이전트 초기화 실패")
}

/// 문서 수집 명령어 (ingest)
async fn cmd_ingest(config: AgentConfig, paths: Vec<PathBuf>) -> Result<()> {
    let mut agent = open_agent(config).await?;

    println!("[*] 수집 경로: {:?}", paths);
    let report = agent.ingest(&paths).await?;

    if report.documents == 0 {
        println!("[!] 사용할 수 있는 문서를 찾지 못했습니다 (파일 {}개 확인)", report.files);
        return Ok(());
    }

    println!("[OK] 문서 {}개 → 패시지 {}개 인덱싱", report.documents, report.passages);
    if report.documents < report.files {
        println!(
            "     (읽지 못한 파일 {}개는 건너뜀)",
            report.files - report.documents
        );
    }
    println!("     저장 위치: {}", agent.config().index_dir().display());

    Ok(())
}

/// 질의 명령어 (ask / smart-ask)
async fn cmd_ask(config: AgentConfig, query: &str, smart: bool) -> Result<()> {
    let agent = open_agent(config).await?;

    let answer = if smart {
        agent.smart_answer(query, &[]).await
    } else {
        agent.rag_answer(query).await
    };

    println!("{}", answer);
    Ok(())
}

/// 도구 명령어 (tool)
///
/// 계산기는 API 키 없이도 동작합니다.
async fn cmd_tool(config: AgentConfig, name: &str, args: &[String]) -> Result<()> {
    let kv = parse_tool_args(args);

    let output = if name == "calc" && !has_api_key() {
        calc_tool(kv.get("expr").map(String::as_str).unwrap_or(""))
    } else {
        open_agent(config).await?.call_tool(name, &kv).await
    };

    println!("{}", output);
    Ok(())
}

/// 대화 입력
#[derive(Debug, PartialEq)]
enum ChatInput {
    Quit,
    Clear,
    History,
    Profile(Vec<String>),
    Question(String),
    Empty,
}

fn parse_chat_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }

    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("/exit") | Some("/quit") => ChatInput::Quit,
        Some("/clear") => ChatInput::Clear,
        Some("/history") => ChatInput::History,
        Some("/profile") => ChatInput::Profile(parts.map(String::from).collect()),
        _ => ChatInput::Question(line.to_string()),
    }
}

/// 대화 명령어 (chat)
async fn cmd_chat(config: AgentConfig, session: Option<String>) -> Result<()> {
    let history_limit = config.history_limit;
    let agent = open_agent(config).await?;
    let mut sessions = SessionStore::new(history_limit);
    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    println!("[*] 세션 {} (종료: /exit, 기록 삭제: /clear, 기록 보기: /history)", session_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_chat_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Clear => {
                sessions.clear(&session_id);
                println!("[OK] 대화 기록을 지웠습니다");
            }
            ChatInput::History => {
                for m in sessions.history(&session_id, history_limit) {
                    let who = match m.role {
                        Role::User => "사용자",
                        Role::Assistant => "도우미",
                    };
                    println!(
                        "  {} {}: {}",
                        m.created_at.format("%H:%M:%S"),
                        who,
                        truncate_text(&m.content, 80)
                    );
                }
            }
            ChatInput::Profile(fields) => {
                if !fields.is_empty() {
                    sessions.set_profile(&session_id, parse_tool_args(fields.as_slice()));
                }
                let mut profile: Vec<_> = sessions.profile(&session_id).into_iter().collect();
                profile.sort();
                for (k, v) in profile {
                    println!("  {} = {}", k, v);
                }
            }
            ChatInput::Question(question) => {
                let history = sessions.history(&session_id, history_limit);
                let answer = agent.smart_answer(&question, &history).await;
                println!("\n{}\n", answer);

                sessions.add_message(&session_id, Message::user(question));
                sessions.add_message(&session_id, Message::assistant(answer));
            }
        }
    }

    Ok(())
}

/// 블로그 업데이트 수집 명령어 (fetch-updates)
async fn cmd_fetch_updates(config: AgentConfig, out: Option<PathBuf>, limit: usize) -> Result<()> {
    let dir = out.unwrap_or_else(|| config.samples_dir());
    let fetcher = BlogFetcher::new()?.with_limit(limit);

    let written = fetcher.fetch_and_save(&default_sources(), &dir).await?;

    if written.is_empty() {
        println!("[!] 저장된 파일이 없습니다");
        return Ok(());
    }

    for path in &written {
        println!("[OK] {}", path.display());
    }
    println!();
    println!("다음 명령으로 로컬 지식에 추가하세요:");
    println!("  smart-knowledge ingest {}", dir.display());

    Ok(())
}

/// 상태 명령어 (status)
///
/// 시스템 상태를 확인합니다. API 키 없이도 동작합니다.
async fn cmd_status(config: AgentConfig) -> Result<()> {
    println!("smart-knowledge v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());

    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY=your-key");
    }

    println!("[*] 생성 모델: {}", config.model_name);
    println!(
        "[*] 판정 기준: sim_tau={} min_good={} min_prop={} (top_k {}, 키워드 {})",
        config.thresholds.sim_tau,
        config.thresholds.min_good,
        config.thresholds.min_prop,
        config.top_k,
        config.keywords
    );

    let index_dir = config.index_dir();
    match VectorStore::load(&index_dir).await {
        Ok(store) => {
            let stats = store.stats();
            println!(
                "[OK] 벡터 인덱스: 패시지 {}개, 출처 {}개 ({})",
                stats.passage_count, stats.sources, stats.backend
            );
            if let Some(dim) = stats.dimension {
                println!("     차원: {}", dim);
            }
        }
        Err(e) => {
            println!("[!] 벡터 인덱스 없음 (새 인덱스 백엔드: {})", config.index_kind);
            tracing::debug!("Index load failed: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
        assert_eq!(truncate_text("안녕하세요 세계", 5), "안녕하세요...");
    }

    #[test]
    fn test_parse_chat_input() {
        assert_eq!(parse_chat_input("   "), ChatInput::Empty);
        assert_eq!(parse_chat_input("/exit"), ChatInput::Quit);
        assert_eq!(parse_chat_input("/clear"), ChatInput::Clear);
        assert_eq!(
            parse_chat_input("/profile lang=ko level=expert"),
            ChatInput::Profile(vec!["lang=ko".into(), "level=expert".into()])
        );
        assert_eq!(
            parse_chat_input(" RAG가 뭐야? "),
            ChatInput::Question("RAG가 뭐야?".into())
        );
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["smart-knowledge", "tool", "calc", "expr=1+2*3"]).unwrap();
        match cli.command {
            Commands::Tool { name, args } => {
                assert_eq!(name, "calc");
                assert_eq!(args, vec!["expr=1+2*3"]);
            }
            _ => panic!("expected tool command"),
        }

        let cli = Cli::try_parse_from(["smart-knowledge", "-v", "smart-ask", "RAG?"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::SmartAsk { .. }));

        assert!(Cli::try_parse_from(["smart-knowledge", "ingest"]).is_err());
    }

    #[test]
    fn test_quoted_tool_argument_kept_whole() {
        // 셸에서 "expr=1 + 2*3"처럼 따옴표로 묶은 인자
        let cli =
            Cli::try_parse_from(["smart-knowledge", "tool", "calc", "expr=1 + 2*3"]).unwrap();
        let Commands::Tool { args, .. } = cli.command else {
            panic!("expected tool command");
        };

        let parsed = parse_tool_args(args.as_slice());
        assert_eq!(parsed.get("expr").map(String::as_str), Some("1 + 2*3"));
        assert_eq!(calc_tool(&parsed["expr"]), "7");
    }
}
