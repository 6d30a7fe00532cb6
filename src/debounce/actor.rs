//! Per-user debounce actor

use super::turn::{Content, InboundMessage, Turn, UserId};
use super::{ActorMap, DebounceSettings, TurnHandler};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Owns one user's pending messages and quiet-window deadline
pub(super) struct UserActor {
    user: UserId,
    rx: mpsc::UnboundedReceiver<InboundMessage>,
    actors: ActorMap,
    handler: Arc<dyn TurnHandler>,
    settings: DebounceSettings,
    pending: Vec<Content>,
    reply_token: String,
    deadline: Option<Instant>,
    /// Most recently emitted turn; the next one waits for it
    in_flight: Option<JoinHandle<()>>,
}

impl UserActor {
    pub(super) fn new(
        user: UserId,
        rx: mpsc::UnboundedReceiver<InboundMessage>,
        actors: ActorMap,
        handler: Arc<dyn TurnHandler>,
        settings: DebounceSettings,
    ) -> Self {
        Self {
            user,
            rx,
            actors,
            handler,
            settings,
            pending: Vec::new(),
            reply_token: String::new(),
            deadline: None,
            in_flight: None,
        }
    }

    pub(super) async fn run(mut self) {
        tracing::debug!(user = %self.user, "debounce actor started");
        let mut idle_since = Instant::now();

        loop {
            let wake = self
                .deadline
                .unwrap_or(idle_since + self.settings.actor_idle);

            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(message) => self.buffer(message),
                    None => {
                        self.flush();
                        break;
                    }
                },
                () = sleep_until(wake) => {
                    if self.deadline.is_some() {
                        self.flush();
                    } else if self.try_retire().await {
                        break;
                    }
                    idle_since = Instant::now();
                }
            }
        }

        tracing::debug!(user = %self.user, "debounce actor stopped");
    }

    fn buffer(&mut self, message: InboundMessage) {
        self.pending.push(message.content);
        self.reply_token = message.reply_token;
        self.deadline = Some(Instant::now() + self.settings.window);
        tracing::info!(
            user = %self.user,
            buffered = self.pending.len(),
            window_secs = self.settings.window.as_secs(),
            "Message buffered"
        );
    }

    fn flush(&mut self) {
        self.deadline = None;
        if self.pending.is_empty() {
            return;
        }

        let turn = Turn {
            user: self.user.clone(),
            reply_token: std::mem::take(&mut self.reply_token),
            contents: std::mem::take(&mut self.pending),
        };
        tracing::info!(user = %self.user, messages = turn.contents.len(), "Turn ready");

        let previous = self.in_flight.take();
        let handler = Arc::clone(&self.handler);
        self.in_flight = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::error!(error = %e, "previous turn task failed");
                }
            }
            handler.handle_turn(turn).await;
        }));
    }

    /// Leave the actor map if nothing is buffered or still being processed.
    ///
    /// Senders only send while holding the map lock, so once the entry is gone
    /// under that lock no message can reach this receiver.
    async fn try_retire(&mut self) -> bool {
        if self.in_flight.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let mut actors = self.actors.lock().await;
        if let Ok(message) = self.rx.try_recv() {
            drop(actors);
            self.buffer(message);
            return false;
        }
        actors.remove(&self.user);
        drop(actors);

        tracing::debug!(user = %self.user, "retiring idle debounce actor");
        true
    }
}
