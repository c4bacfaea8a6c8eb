//! Transcrições por sessão: log append-only de `(mensagem, resposta, hora)`.
//!
//! Uma sessão pertence a um usuário; um usuário pode ter várias sessões.
//! O crescimento é ilimitado por sessão.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

/// Comprimento máximo aceito para um `session_id`.
pub const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exchange {
    pub user_message: String,
    pub bot_message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub history: Vec<Exchange>,
}

/// `true` para 1..=128 caracteres de `[A-Za-z0-9_-]`.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Default)]
pub struct SessionLog {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cria uma sessão com id gerado pelo servidor (UUID v4).
    pub fn create(&self, user_id: Option<&str>) -> String {
        let session_id = Uuid::new_v4().to_string();
        let user_id = user_id.unwrap_or(&session_id).to_string();
        self.sessions.write().insert(
            session_id.clone(),
            Session {
                session_id: session_id.clone(),
                user_id,
                created_at: Utc::now(),
                history: Vec::new(),
            },
        );
        tracing::debug!(session_id = %session_id, "Sessão criada");
        session_id
    }

    /// Anexa uma troca, criando a sessão no primeiro uso.
    pub fn append(&self, session_id: &str, user_id: &str, user_message: &str, bot_message: &str) {
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
                created_at: Utc::now(),
                history: Vec::new(),
            });
        session.history.push(Exchange {
            user_message: user_message.to_string(),
            bot_message: bot_message.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Transcrição da sessão; vazia se a sessão não existe.
    pub fn history(&self, session_id: &str) -> Vec<Exchange> {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_validation() {
        assert!(is_valid_session_id("abc-123_XYZ"));
        assert!(is_valid_session_id(&Uuid::new_v4().to_string()));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("has space"));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id(&"a".repeat(MAX_SESSION_ID_LEN + 1)));
    }

    #[test]
    fn appends_create_sessions_on_first_use() {
        let log = SessionLog::new();
        assert!(log.history("s1").is_empty());
        log.append("s1", "u1", "hello", "Hi there!");
        log.append("s1", "u1", "bye", "Take care.");
        let history = log.history("s1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].user_message, "bye");
        assert_eq!(log.get("s1").unwrap().user_id, "u1");
    }

    #[test]
    fn created_sessions_default_user_to_session_id() {
        let log = SessionLog::new();
        let id = log.create(None);
        assert!(is_valid_session_id(&id));
        assert_eq!(log.get(&id).unwrap().user_id, id);
        let other = log.create(Some("alice"));
        assert_eq!(log.get(&other).unwrap().user_id, "alice");
        assert_eq!(log.len(), 2);
    }
}
