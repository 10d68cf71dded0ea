use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Words that point back at someone mentioned earlier in the conversation
const REFERENCE_WORDS: &[&str] = &[
    "él", "ella", "ellos", "ellas", "su", "sus", "le", "les", "también", "tambien", "además",
    "ademas", "ese", "esa", "este", "esta", "dicho", "dicha", "mismo", "misma",
];

const SHORT_QUERY_WORDS: usize = 4;

/// Prior exchanges of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    previous_query: Option<String>,
    previous_answer: Option<String>,
    query_history: VecDeque<String>,
    answer_history: VecDeque<String>,
    max_history: usize,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl SessionContext {
    pub fn new(max_history: usize) -> Self {
        Self {
            previous_query: None,
            previous_answer: None,
            query_history: VecDeque::new(),
            answer_history: VecDeque::new(),
            max_history: max_history.max(1),
        }
    }

    pub fn previous_query(&self) -> Option<&str> {
        self.previous_query.as_deref()
    }

    pub fn previous_answer(&self) -> Option<&str> {
        self.previous_answer.as_deref()
    }

    pub fn query_history(&self) -> impl Iterator<Item = &str> {
        self.query_history.iter().map(String::as_str)
    }

    pub fn answer_history(&self) -> impl Iterator<Item = &str> {
        self.answer_history.iter().map(String::as_str)
    }

    pub fn history_len(&self) -> usize {
        self.query_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous_query.is_none()
    }

    /// Remember a completed exchange, dropping the oldest beyond the history bound
    pub fn record(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        let query = query.into();
        let answer = answer.into();

        self.query_history.push_back(query.clone());
        self.answer_history.push_back(answer.clone());

        while self.query_history.len() > self.max_history {
            self.query_history.pop_front();
        }
        while self.answer_history.len() > self.max_history {
            self.answer_history.pop_front();
        }

        self.previous_query = Some(query);
        self.previous_answer = Some(answer);
    }

    pub fn reset(&mut self) {
        self.previous_query = None;
        self.previous_answer = None;
        self.query_history.clear();
        self.answer_history.clear();
    }

    /// Stable digest of the previous exchange
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_query.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.previous_answer.as_deref().unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the query most likely continues the previous exchange
    pub fn is_follow_up(&self, query: &str) -> bool {
        if self.previous_query.is_none() {
            return false;
        }

        let lowered = query.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .collect();

        tokens.len() <= SHORT_QUERY_WORDS
            || tokens.iter().any(|token| REFERENCE_WORDS.contains(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sets_previous() {
        let mut context = SessionContext::default();
        assert!(context.is_empty());

        context.record("¿Quién es Luis Pérez?", "Luis Pérez es docente.");
        assert_eq!(context.previous_query(), Some("¿Quién es Luis Pérez?"));
        assert_eq!(context.previous_answer(), Some("Luis Pérez es docente."));
        assert_eq!(context.history_len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut context = SessionContext::new(3);
        for i in 0..5 {
            context.record(format!("q{i}"), format!("a{i}"));
        }

        let queries: Vec<&str> = context.query_history().collect();
        assert_eq!(queries, vec!["q2", "q3", "q4"]);
        let answers: Vec<&str> = context.answer_history().collect();
        assert_eq!(answers, vec!["a2", "a3", "a4"]);
    }

    #[test]
    fn test_reset() {
        let mut context = SessionContext::default();
        context.record("q", "a");
        context.reset();

        assert!(context.is_empty());
        assert_eq!(context.history_len(), 0);
        assert_eq!(context.fingerprint(), SessionContext::default().fingerprint());
    }

    #[test]
    fn test_fingerprint_is_stable_and_distinct() {
        let mut first = SessionContext::default();
        first.record("q", "a");
        let mut second = SessionContext::new(5);
        second.record("q", "a");
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);

        let mut third = SessionContext::default();
        third.record("q", "b");
        assert_ne!(first.fingerprint(), third.fingerprint());
    }

    #[test]
    fn test_follow_up_detection() {
        let mut context = SessionContext::default();
        assert!(!context.is_follow_up("¿y su correo?"));

        context.record("¿Quién es Luis Pérez?", "Luis Pérez es docente.");
        assert!(context.is_follow_up("¿y su correo?"));
        assert!(context.is_follow_up("¿Dónde vive él actualmente con su familia?"));
        assert!(context.is_follow_up("teléfono"));
        assert!(!context.is_follow_up("¿Cuál es el correo de Carmen Celina Ramírez?"));
    }
}
