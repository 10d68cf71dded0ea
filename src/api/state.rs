//! Application state for shared services

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::SessionConfig;
use crate::domain::{ContactStore, SessionContext};
use crate::infrastructure::services::AssistantService;

/// Conversation contexts keyed by session id.
///
/// Bounded in count and dropped after sitting idle, so abandoned sessions
/// do not accumulate.
#[derive(Debug)]
pub struct SessionRegistry {
    contexts: Cache<String, SessionContext>,
    max_history: usize,
}

impl SessionRegistry {
    pub fn new(max_history: usize, max_sessions: u64, idle_timeout: Duration) -> Self {
        Self {
            contexts: Cache::builder()
                .max_capacity(max_sessions)
                .time_to_idle(idle_timeout)
                .build(),
            max_history,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.max_history, config.max_sessions, config.idle_timeout())
    }

    /// Reuse the caller's session id or start a new one
    pub fn resolve_id(session_id: Option<&str>) -> String {
        match session_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Copy of a session's context, if the session exists
    pub async fn get(&self, session_id: &str) -> Option<SessionContext> {
        self.contexts.get(session_id).await
    }

    pub async fn record(&self, session_id: &str, query: &str, answer: &str) {
        let max_history = self.max_history;
        self.contexts
            .entry_by_ref(session_id)
            .and_upsert_with(|existing| {
                let mut context = existing
                    .map(|entry| entry.into_value())
                    .unwrap_or_else(|| SessionContext::new(max_history));
                context.record(query, answer);
                std::future::ready(context)
            })
            .await;
    }

    /// Clear a session's history. Returns false when the session is unknown.
    pub async fn reset(&self, session_id: &str) -> bool {
        match self.contexts.get(session_id).await {
            Some(mut context) => {
                context.reset();
                self.contexts.insert(session_id.to_string(), context).await;
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.contexts.run_pending_tasks().await;
        self.contexts.entry_count() as usize
    }
}

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<AssistantService>,
    pub store: Arc<dyn ContactStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        assistant: Arc<AssistantService>,
        store: Arc<dyn ContactStore>,
        sessions: &SessionConfig,
    ) -> Self {
        Self {
            assistant,
            store,
            sessions: Arc::new(SessionRegistry::from_config(sessions)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(3, 100, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_record_creates_session() {
        let registry = registry();
        assert!(registry.get("a").await.is_none());

        registry.record("a", "¿Quién es Luis Pérez?", "Es docente.").await;

        let context = registry.get("a").await.unwrap();
        assert_eq!(context.previous_query(), Some("¿Quién es Luis Pérez?"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reset_unknown_session() {
        let registry = registry();
        assert!(!registry.reset("missing").await);

        registry.record("a", "q", "r").await;
        assert!(registry.reset("a").await);
        assert!(registry.get("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_keeps_appending_to_one_session() {
        let registry = registry();
        registry.record("a", "¿Quién es Luis Pérez?", "Es docente.").await;
        registry.record("a", "¿Y su teléfono?", "618-555-0101").await;

        let context = registry.get("a").await.unwrap();
        assert_eq!(context.previous_query(), Some("¿Y su teléfono?"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_forgotten() {
        let registry = SessionRegistry::new(3, 100, Duration::from_millis(100));
        registry.record("a", "q", "r").await;
        assert!(registry.get("a").await.is_some());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(registry.get("a").await.is_none());
        assert!(!registry.reset("a").await);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_session_count_is_bounded() {
        let registry = SessionRegistry::new(3, 2, Duration::from_secs(60));
        for id in ["a", "b", "c", "d", "e"] {
            registry.record(id, "q", "r").await;
        }

        assert!(registry.len().await <= 2);
    }

    #[test]
    fn test_resolve_id() {
        assert_eq!(SessionRegistry::resolve_id(Some("abc")), "abc");
        assert_eq!(SessionRegistry::resolve_id(Some("  ")).len(), 36);
        assert_ne!(
            SessionRegistry::resolve_id(None),
            SessionRegistry::resolve_id(None)
        );
    }
}
