use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::session::{Session, UserId};

/// Per-user session state. Implementations hold at most one session per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Option<Session>;
    async fn put(&self, session: Session);
    async fn remove(&self, user_id: &UserId) -> Option<Session>;
    async fn len(&self) -> usize;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &UserId) -> Option<Session> {
        self.sessions.read().await.get(user_id).cloned()
    }

    async fn put(&self, session: Session) {
        self.sessions.write().await.insert(session.user_id.clone(), session);
    }

    async fn remove(&self, user_id: &UserId) -> Option<Session> {
        self.sessions.write().await.remove(user_id)
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemorySessionStore, SessionStore};
    use crate::domain::session::{Session, UserId};
    use crate::flows::states::SessionState;

    #[tokio::test]
    async fn put_replaces_the_previous_session_for_a_user() {
        let store = InMemorySessionStore::new();
        let user = UserId::new("U1");

        let mut first = Session::start(user.clone());
        first.advance(SessionState::AwaitingPeriod);
        store.put(first).await;
        store.put(Session::start(user.clone())).await;
        store.put(Session::start(UserId::new("U2"))).await;

        assert_eq!(store.len().await, 2);
        let current = store.get(&user).await.expect("session should exist");
        assert_eq!(current.state, SessionState::AwaitingRole);

        assert!(store.remove(&user).await.is_some());
        assert!(store.remove(&user).await.is_none());
        assert_eq!(store.len().await, 1);
    }
}
