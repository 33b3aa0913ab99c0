//! 세션 대화 기록 및 사용자 프로필
//!
//! 세션마다 최근 메시지 `history_limit`개만 보관하고,
//! 세션 수가 `MAX_SESSIONS`를 넘으면 가장 오래 사용하지 않은 세션을 버립니다.
//! 프로필은 세션에 속하므로 세션과 함께 버려집니다.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 동시에 보관하는 최대 세션 수
pub const MAX_SESSIONS: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 대화 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Default)]
struct Session {
    messages: VecDeque<Message>,
    profile: HashMap<String, String>,
    last_used: u64,
}

// ============================================================================
// SessionStore
// ============================================================================

/// 세션별 대화 기록 저장소
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    history_limit: usize,
    max_sessions: usize,
    clock: u64,
}

impl SessionStore {
    /// # Arguments
    /// * `history_limit` - 세션당 보관 메시지 수 (최소 1)
    pub fn new(history_limit: usize) -> Self {
        Self::with_capacity(history_limit, MAX_SESSIONS)
    }

    pub fn with_capacity(history_limit: usize, max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            history_limit: history_limit.max(1),
            max_sessions: max_sessions.max(1),
            clock: 0,
        }
    }

    /// 메시지 추가 (한도 초과 시 가장 오래된 메시지 제거)
    pub fn add_message(&mut self, session_id: &str, message: Message) {
        let limit = self.history_limit;
        let session = self.touch(session_id);
        session.messages.push_back(message);
        while session.messages.len() > limit {
            session.messages.pop_front();
        }
    }

    /// 최근 메시지 (오래된 순, 최대 `limit`개)
    pub fn history(&mut self, session_id: &str, limit: usize) -> Vec<Message> {
        self.clock += 1;
        let now = self.clock;

        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.last_used = now;
                let start = session.messages.len().saturating_sub(limit);
                session.messages.iter().skip(start).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// 대화 기록 삭제 (프로필은 유지, 프로필도 없으면 세션 자체를 제거)
    pub fn clear(&mut self, session_id: &str) {
        let drop_session = match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.messages.clear();
                session.profile.is_empty()
            }
            None => false,
        };
        if drop_session {
            self.sessions.remove(session_id);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// 프로필 병합 (같은 키는 덮어씀)
    ///
    /// 세션 사용으로 취급되어 LRU 순서가 갱신됩니다.
    pub fn set_profile<I, K, V>(&mut self, session_id: &str, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let session = self.touch(session_id);
        for (k, v) in fields {
            session.profile.insert(k.into(), v.into());
        }
    }

    /// 프로필 조회 (없으면 빈 맵)
    pub fn profile(&self, session_id: &str) -> HashMap<String, String> {
        self.sessions
            .get(session_id)
            .map(|s| s.profile.clone())
            .unwrap_or_default()
    }

    /// 세션을 최근 사용으로 표시 (없으면 만들고, 가득 차면 하나를 버림)
    fn touch(&mut self, session_id: &str) -> &mut Session {
        self.clock += 1;
        let now = self.clock;

        if !self.sessions.contains_key(session_id) && self.sessions.len() >= self.max_sessions {
            self.evict_least_recent();
        }

        let session = self.sessions.entry(session_id.to_string()).or_default();
        session.last_used = now;
        session
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|(_, s)| s.last_used)
            .map(|(id, _)| id.clone());

        if let Some(id) = oldest {
            tracing::debug!("Evicting session {}", id);
            self.sessions.remove(&id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
