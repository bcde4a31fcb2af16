use crate::memory::buffer::MemoryBuffer;
use crate::utils::toml_config::MemoryConfig;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Handle to one session's buffer. Holding the lock makes the holder the
/// only request flow touching that session.
pub type SessionMemory = Arc<tokio::sync::Mutex<MemoryBuffer>>;

/// Per-session memory buffers, created on first use.
///
/// At most `max_sessions` are kept; creating one more forgets the least
/// recently used session.
pub struct SessionStore {
    config: MemoryConfig,
    sessions: Mutex<LruCache<String, SessionMemory>>,
}

impl SessionStore {
    pub fn new(config: MemoryConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Buffer for `session_id`, or a fresh session when `None`.
    ///
    /// Returns the id actually used.
    pub fn get_or_create(&self, session_id: Option<&str>) -> (String, SessionMemory) {
        let id = match session_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.sessions.lock();
        if let Some(memory) = sessions.get(&id) {
            return (id, memory.clone());
        }

        let memory: SessionMemory = Arc::new(tokio::sync::Mutex::new(MemoryBuffer::new(
            self.config.max_turns,
            self.config.max_tokens,
        )));
        if let Some((evicted, _)) = sessions.push(id.clone(), memory.clone()) {
            debug!(session = %evicted, "Session evicted");
        }

        (id, memory)
    }

    pub fn get(&self, session_id: &str) -> Option<SessionMemory> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.lock().pop(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationTurn;

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new(MemoryConfig::default());
        let (a, memory_a) = store.get_or_create(Some("alice"));
        let (b, memory_b) = store.get_or_create(Some("bob"));
        assert_ne!(a, b);

        memory_a.lock().await.push(ConversationTurn::new("q", "a"));
        assert_eq!(memory_a.lock().await.len(), 1);
        assert!(memory_b.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_same_id_same_buffer() {
        let store = SessionStore::new(MemoryConfig::default());
        let (_, first) = store.get_or_create(Some("s1"));
        first.lock().await.push(ConversationTurn::new("q", "a"));

        let (_, again) = store.get_or_create(Some("s1"));
        assert_eq!(again.lock().await.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_new_session_gets_uuid() {
        let store = SessionStore::new(MemoryConfig::default());
        let (id, _) = store.get_or_create(None);
        assert!(Uuid::parse_str(&id).is_ok());
        let (blank, _) = store.get_or_create(Some("  "));
        assert_ne!(blank, id);
        assert!(store.get(&id).is_some());
        assert!(store.remove(&id));
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_store_is_bounded() {
        let store = SessionStore::new(MemoryConfig {
            max_sessions: 3,
            ..MemoryConfig::default()
        });
        for _ in 0..100 {
            store.get_or_create(None);
        }
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_least_recently_used_session_is_forgotten() {
        let store = SessionStore::new(MemoryConfig {
            max_sessions: 2,
            ..MemoryConfig::default()
        });
        let (_, alice) = store.get_or_create(Some("alice"));
        alice.lock().await.push(ConversationTurn::new("q", "a"));
        store.get_or_create(Some("bob"));

        // touching alice makes bob the eviction candidate
        store.get_or_create(Some("alice"));
        store.get_or_create(Some("carol"));

        assert!(store.get("bob").is_none());
        let alice = store.get("alice").unwrap();
        assert_eq!(alice.lock().await.len(), 1);
    }
}
