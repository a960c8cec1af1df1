//! Gateway session management.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use salon_common::models::Role;

/// Tracks all active gateway sessions.
pub struct SessionManager {
    /// Map of session_id → Session
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// Map of account_id → Vec<session_id> (one account, many tabs/devices)
    account_sessions: Arc<RwLock<HashMap<Uuid, Vec<String>>>>,
}

pub struct Session {
    pub session_id: String,
    pub account_id: Uuid,
    pub role: Role,
    /// Last heartbeat time
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            account_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register an identified session.
    pub async fn register(&self, session_id: String, account_id: Uuid, role: Role) {
        let session = Session {
            session_id: session_id.clone(),
            account_id,
            role,
            last_heartbeat: chrono::Utc::now(),
        };

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), session);

        self.account_sessions
            .write()
            .await
            .entry(account_id)
            .or_default()
            .push(session_id);
    }

    /// Record a heartbeat.
    pub async fn touch(&self, session_id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(session_id) {
            session.last_heartbeat = chrono::Utc::now();
        }
    }

    /// Remove a session.
    pub async fn remove(&self, session_id: &str) {
        if let Some(session) = self.sessions.write().await.remove(session_id) {
            let mut by_account = self.account_sessions.write().await;
            if let Some(ids) = by_account.get_mut(&session.account_id) {
                ids.retain(|s| s != session_id);
                if ids.is_empty() {
                    by_account.remove(&session.account_id);
                }
            }
        }
    }

    /// Whether an account has at least one open session.
    pub async fn is_connected(&self, account_id: Uuid) -> bool {
        self.account_sessions
            .read()
            .await
            .get(&account_id)
            .is_some_and(|ids| !ids.is_empty())
    }

    /// Get total active sessions count.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_tracked_per_account() {
        let manager = SessionManager::new();
        let account = Uuid::from_u128(1);

        manager.register("a".into(), account, Role::Staff).await;
        manager.register("b".into(), account, Role::Staff).await;
        assert_eq!(manager.active_count().await, 2);

        manager.remove("a").await;
        assert!(manager.is_connected(account).await);

        manager.remove("b").await;
        assert!(!manager.is_connected(account).await);
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn removing_unknown_session_is_a_no_op() {
        let manager = SessionManager::default();
        manager.remove("missing").await;
        manager.touch("missing").await;
        assert_eq!(manager.active_count().await, 0);
    }
}
