//! Connection supervision.
//!
//! The supervisor owns the connection state and the live store handle. A
//! background task connects with bounded backoff, then parks until a
//! transport error is reported, then reconnects. State only changes through
//! the `on_*` transition handlers.
//!
//! Each successful connect starts a new generation. Commands carry the
//! generation of the store they ran on, so a late failure from a replaced
//! connection cannot tear down its successor.

use crate::metrics::CacheMetrics;
use crate::store::{CacheStore, StoreConnector};
use crate::{CacheError, ConnectionState};
use parking_lot::{Mutex, RwLock};
use pulse_resilience::RetryPolicy;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A connected store tagged with the connection generation it belongs to.
#[derive(Clone)]
pub(crate) struct ActiveStore {
    generation: u64,
    store: Arc<dyn CacheStore>,
}

impl ActiveStore {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl Deref for ActiveStore {
    type Target = dyn CacheStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

pub(crate) struct ConnectionSupervisor {
    prefix: String,
    state: watch::Sender<ConnectionState>,
    store: RwLock<Option<ActiveStore>>,
    /// Generation of the most recent connection.
    generation: AtomicU64,
    reconnect: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionSupervisor {
    pub(crate) fn new(prefix: impl Into<String>, initial: ConnectionState) -> Self {
        let prefix = prefix.into();
        CacheMetrics::connection_state(&prefix, initial);
        let (state, _) = watch::channel(initial);
        Self {
            prefix,
            state,
            store: RwLock::new(None),
            generation: AtomicU64::new(0),
            reconnect: Notify::new(),
            task: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// The live store, only while connected.
    pub(crate) fn current_store(&self) -> Option<ActiveStore> {
        if !self.state().is_connected() {
            return None;
        }
        self.store.read().clone()
    }

    /// Waits until the state is connected, disabled or closed.
    pub(crate) async fn settled(&self) -> ConnectionState {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let result = rx.wait_for(|state| state.is_settled()).await.map(|state| *state);
        result.unwrap_or(ConnectionState::Closed)
    }

    /// Starts the background connection task on the current runtime.
    ///
    /// Without a runtime the supervisor goes straight to `Disabled`.
    pub(crate) fn spawn(self: &Arc<Self>, connector: Arc<dyn StoreConnector>, policy: RetryPolicy) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    target_store = %connector.describe(),
                    "No async runtime available; caching disabled"
                );
                self.transition(ConnectionState::Disabled);
                return;
            }
        };

        let supervisor = Arc::clone(self);
        let task = handle.spawn(async move { supervisor.run(connector, policy).await });
        *self.task.lock() = Some(task);
    }

    async fn run(self: Arc<Self>, connector: Arc<dyn StoreConnector>, policy: RetryPolicy) {
        let target = connector.describe();
        let max_attempts = policy.max_attempts;

        loop {
            if self.state() == ConnectionState::Closed {
                return;
            }

            let mut attempt = 0u32;
            let result = policy
                .execute(|| {
                    attempt += 1;
                    let current = attempt;
                    let supervisor = Arc::clone(&self);
                    let connector = Arc::clone(&connector);
                    let target = target.clone();
                    async move {
                        supervisor.on_connecting();
                        let result = connector.connect().await;
                        if let Err(e) = &result {
                            supervisor.on_attempt_failed(&target, current, max_attempts, e);
                        }
                        result
                    }
                })
                .await;

            match result {
                Ok(store) => {
                    self.on_connected(store, &target);
                    // A permit is stored if the error arrives before we park.
                    self.reconnect.notified().await;
                }
                Err(e) => {
                    self.on_gave_up(&target, max_attempts, &e);
                    return;
                }
            }
        }
    }

    pub(crate) fn on_connecting(&self) {
        self.transition(ConnectionState::Connecting);
    }

    fn on_attempt_failed(&self, target: &str, attempt: u32, max_attempts: u32, err: &CacheError) {
        self.transition(ConnectionState::Disconnected);
        warn!(
            target_store = %target,
            attempt,
            max_attempts,
            error = %err,
            "Cache connection attempt failed"
        );
    }

    pub(crate) fn on_connected(&self, store: Arc<dyn CacheStore>, target: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.store.write() = Some(ActiveStore { generation, store });
        if self.transition(ConnectionState::Connected) {
            info!(target_store = %target, generation, "Connected to cache store");
        } else {
            // Closed or disabled in the meantime.
            self.store.write().take();
        }
    }

    /// Reports a connection-level failure seen by a command that ran on the
    /// store of `generation`.
    ///
    /// Only the first report for the current connection flips the state and
    /// wakes the reconnection task; reports from older connections are
    /// ignored.
    pub(crate) fn on_transport_error(&self, generation: u64, err: &CacheError) {
        let flipped = self.state.send_if_modified(|state| {
            if state.is_connected() && self.generation.load(Ordering::SeqCst) == generation {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });

        if !flipped {
            debug!(generation, error = %err, "Ignoring transport error from an inactive connection");
            return;
        }

        self.store.write().take();
        CacheMetrics::connection_state(&self.prefix, ConnectionState::Disconnected);
        error!(generation, error = %err, "Lost connection to cache store; reconnecting");
        self.reconnect.notify_one();
    }

    pub(crate) fn on_gave_up(&self, target: &str, attempts: u32, err: &CacheError) {
        self.store.write().take();
        if self.transition(ConnectionState::Disabled) {
            error!(
                target_store = %target,
                attempts,
                error = %err,
                "Giving up on cache store; caching disabled"
            );
        }
    }

    pub(crate) fn on_closed(&self) -> bool {
        self.store.write().take();
        self.transition(ConnectionState::Closed)
    }

    /// Stops the background task, if any.
    pub(crate) fn abort_task(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Applies a transition. `Closed` is final; `Disabled` only leads to `Closed`.
    fn transition(&self, next: ConnectionState) -> bool {
        let changed = self.state.send_if_modified(|state| {
            let allowed = match *state {
                ConnectionState::Closed => false,
                ConnectionState::Disabled => next == ConnectionState::Closed,
                current => current != next,
            };
            if allowed {
                *state = next;
            }
            allowed
        });

        if changed {
            CacheMetrics::connection_state(&self.prefix, next);
            debug!(state = %next, "Cache connection state changed");
        }
        changed
    }
}
