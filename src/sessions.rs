//! User to remote session mapping

use crate::assistant::{AssistantApi, AssistantError, SessionId};
use crate::debounce::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Entry {
    cell: Arc<OnceCell<SessionId>>,
    last_used: Instant,
}

/// Lazily created, per-user assistant sessions
pub struct SessionRegistry {
    entries: RwLock<HashMap<UserId, Entry>>,
    idle_ttl: Option<Duration>,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Session for `user`, creating it on first use.
    ///
    /// Concurrent callers for one user share a single creation; a failed
    /// creation leaves nothing behind so the next turn tries again.
    pub async fn get_or_create(
        &self,
        user: &UserId,
        api: &dyn AssistantApi,
    ) -> Result<SessionId, AssistantError> {
        let cell = {
            let mut entries = self.entries.write().await;
            let entry = entries.entry(user.clone()).or_insert_with(|| Entry {
                cell: Arc::new(OnceCell::new()),
                last_used: Instant::now(),
            });
            entry.last_used = Instant::now();
            Arc::clone(&entry.cell)
        };

        let session = cell
            .get_or_try_init(|| async {
                let id = api.create_session().await?;
                if id.trim().is_empty() {
                    return Err(AssistantError::unknown("Session created without an id"));
                }
                tracing::info!(user = %user, session = %id, "Bound user to new session");
                Ok(id)
            })
            .await?;

        Ok(session.clone())
    }

    /// Cached session for `user`, if one exists
    #[allow(dead_code)] // API completeness
    pub async fn get(&self, user: &UserId) -> Option<SessionId> {
        let entries = self.entries.read().await;
        entries.get(user).and_then(|e| e.cell.get().cloned())
    }

    pub async fn session_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Forget sessions unused for longer than the idle TTL; returns how many.
    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.last_used) < ttl);
        before - entries.len()
    }

    /// Periodically evict idle sessions until `cancel` fires.
    pub async fn run_sweeper(self: Arc<Self>, cancel: CancellationToken) {
        let Some(ttl) = self.idle_ttl else {
            return;
        };
        let period = (ttl / 4).max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = self.evict_idle().await;
                    if evicted > 0 {
                        let remaining = self.session_count().await;
                        tracing::info!(evicted, remaining, "Evicted idle sessions");
                    }
                }
            }
        }
        tracing::debug!("session sweeper stopped");
    }
}
