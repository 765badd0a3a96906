//! services/api/src/web/state.rs
//!
//! Defines the application's shared state: the single `StoryBook` every request and
//! WebSocket connection works against, the store it is mirrored into, and the
//! broadcast channel that pushes fresh snapshots to connected clients.

use crate::adapters::ThreadRandom;
use crate::config::Config;
use crate::error::ApiError;
use crate::web::protocol::{ServerMessage, Snapshot};
use chrono::Utc;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use stichelbuch_core::ports::KeyValueStore;
use stichelbuch_core::{Action, Effect, Rejection, StateStore, StoryBook};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// How many snapshots a slow WebSocket client may fall behind before it is resynced.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: StateStore,
    /// Every transition goes through this lock, and the durable write finishes
    /// before it is released.
    pub book: Mutex<StoryBook>,
    pub updates: broadcast::Sender<ServerMessage>,
    /// Cancels the pending login-error timer when a newer one replaces it.
    login_timer: StdMutex<Option<CancellationToken>>,
}

/// The result of one dispatched action.
#[derive(Debug)]
pub struct Dispatched {
    pub snapshot: Snapshot,
    pub rejected: Option<Rejection>,
}

impl AppState {
    /// Loads the persisted model (falling back to defaults) and wraps it up.
    pub async fn load(config: Arc<Config>, kv: Arc<dyn KeyValueStore>) -> Arc<Self> {
        let store = StateStore::new(kv);
        let model = store.load().await;
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            config,
            store,
            book: Mutex::new(StoryBook::new(model)),
            updates,
            login_timer: StdMutex::new(None),
        })
    }

    pub async fn snapshot(&self) -> Snapshot {
        Snapshot::from_book(&*self.book.lock().await)
    }

    pub async fn is_logged_in(&self) -> bool {
        self.book.lock().await.session().is_logged_in
    }

    /// Runs one action: transition, durable write, broadcast, then any timer it asks for.
    pub async fn dispatch(self: &Arc<Self>, action: Action) -> Result<Dispatched, ApiError> {
        let (snapshot, transition) = {
            let mut book = self.book.lock().await;
            let transition = book.dispatch(action, &mut ThreadRandom, Utc::now());
            self.store.persist(book.model(), transition.changes).await?;
            (Snapshot::from_book(&book), transition)
        };

        self.publish(&snapshot);
        if let Some(Effect::ScheduleLoginErrorClear { ticket, after }) = transition.effect {
            self.schedule_login_error_clear(ticket, after);
        }

        Ok(Dispatched {
            snapshot,
            rejected: transition.rejected,
        })
    }

    fn publish(&self, snapshot: &Snapshot) {
        // No receivers just means no WebSocket is open.
        let _ = self.updates.send(ServerMessage::State(snapshot.clone()));
    }

    fn schedule_login_error_clear(self: &Arc<Self>, ticket: u64, after: Duration) {
        let token = CancellationToken::new();
        match self.login_timer.lock() {
            Ok(mut slot) => {
                if let Some(previous) = slot.replace(token.clone()) {
                    previous.cancel();
                }
            }
            Err(e) => error!("Login timer slot poisoned: {}", e),
        }

        let state = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => debug!(ticket, "Login error timer superseded"),
                _ = tokio::time::sleep(after) => state.clear_login_error(ticket).await,
            }
        });
    }

    async fn clear_login_error(&self, ticket: u64) {
        let snapshot = {
            let mut book = self.book.lock().await;
            let transition =
                book.dispatch(Action::ClearLoginError { ticket }, &mut ThreadRandom, Utc::now());
            if let Err(e) = self.store.persist(book.model(), transition.changes).await {
                error!("Failed to persist after clearing login error: {:?}", e);
            }
            Snapshot::from_book(&book)
        };
        debug!(ticket, "Login error cleared");
        self.publish(&snapshot);
    }
}
