//! Turn debouncing
//!
//! Messages from one user are buffered until a quiet window passes with no
//! new message, then handed on as a single turn.

mod actor;
mod turn;

pub use turn::{Content, InboundMessage, Turn, UserId};

use actor::UserActor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Receives every emitted turn
#[async_trait]
pub trait TurnHandler: Send + Sync + 'static {
    async fn handle_turn(&self, turn: Turn);
}

/// Timing of the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Quiet period that ends a turn
    pub window: Duration,
    /// Idle period after which a user's actor retires
    pub actor_idle: Duration,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15),
            actor_idle: Duration::from_secs(600),
        }
    }
}

type ActorMap = Arc<Mutex<HashMap<UserId, mpsc::UnboundedSender<InboundMessage>>>>;

/// Routes inbound messages to per-user actors
pub struct Debouncer {
    actors: ActorMap,
    handler: Arc<dyn TurnHandler>,
    settings: DebounceSettings,
}

impl Debouncer {
    pub fn new(handler: Arc<dyn TurnHandler>, settings: DebounceSettings) -> Self {
        Self {
            actors: Arc::new(Mutex::new(HashMap::new())),
            handler,
            settings,
        }
    }

    /// Append a message to its user's pending turn and restart the window.
    pub async fn push(&self, message: InboundMessage) {
        let mut actors = self.actors.lock().await;

        let message = match actors.get(&message.user) {
            Some(tx) => match tx.send(message) {
                Ok(()) => return,
                Err(mpsc::error::SendError(message)) => {
                    tracing::warn!(user = %message.user, "debounce actor gone, restarting");
                    message
                }
            },
            None => message,
        };

        let user = message.user.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(message).is_err() {
            return;
        }
        actors.insert(user.clone(), tx);

        let actor = UserActor::new(
            user,
            rx,
            Arc::clone(&self.actors),
            Arc::clone(&self.handler),
            self.settings,
        );
        tokio::spawn(actor.run());
    }

    /// Number of users with a live actor
    #[allow(dead_code)] // API completeness
    pub async fn active_users(&self) -> usize {
        self.actors.lock().await.len()
    }
}
