//! Sync orchestrator.
//!
//! The orchestrator owns the sync state machine:
//!
//! ```text
//! idle ──► syncing ──► success
//!   ▲         │  ▲
//!   │         │  └── retry (bounded)
//!   │         ▼
//!   └───── error
//! ```
//!
//! # Cycles
//!
//! A cycle snapshots the cart, submits the snapshot, and retries failed
//! submissions per the `RetryPolicy`. At most one cycle is active at a time.
//! A cycle may be abandoned while it waits, either because connectivity
//! dropped or because `reset_state` was called; an abandoned cycle never
//! writes to the state cell again, so a late response cannot overwrite a
//! newer state.
//!
//! # Locking
//!
//! Flight bookkeeping is only changed from inside a state cell update, so a
//! guard check and the transition it allows happen atomically. Lock order is
//! state cell, then flight, then the cart and connectivity cells. Subscriber
//! callbacks run after every lock is released and may call back into the
//! orchestrator.

use crate::cart::CartManager;
use crate::cell::{StateCell, Subscription};
use crate::connectivity::ConnectivityMonitor;
use crate::endpoint::{OrderId, SyncEndpoint};
use crate::policy::SyncConfig;
use crate::state::{SyncState, SyncStatus, READY_MESSAGE};
use crate::{EndpointError, SyncError, SyncResult};
use chrono::Utc;
use model::CartLine;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;

/// Message set when a sync is refused for lack of connectivity
pub const OFFLINE_MESSAGE: &str = "Cannot sync: offline";
/// Message set when connectivity drops during a cycle
pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost during sync";
/// Message set when a sync finds nothing to send
pub const EMPTY_CART_MESSAGE: &str = "Nothing to sync - cart is empty";
/// Message set when an automatic cycle starts after reconnecting
pub const RECONNECT_MESSAGE: &str = "Reconnected - syncing automatically...";
/// Message set after the cart is cleared following a sync
pub const CART_CLEARED_MESSAGE: &str = "Cart cleared after sync";

/// How a call to `sync` ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The snapshot was accepted by the endpoint
    Synced {
        order_id: Option<OrderId>,
        item_count: usize,
    },
    /// The cart was empty; no request was made
    NothingToSync,
    /// Another cycle is active; nothing was done
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortReason {
    ConnectionLost,
    Reset,
}

impl AbortReason {
    fn into_error(self) -> SyncError {
        match self {
            AbortReason::ConnectionLost => SyncError::ConnectionLost,
            AbortReason::Reset => SyncError::Reset,
        }
    }
}

#[derive(Debug, Default)]
struct Flight {
    next_cycle: u64,
    active: Option<u64>,
    /// Abandoned cycles whose task has not yet noticed, and why
    abandoned: HashMap<u64, AbortReason>,
    /// Bumped on every connectivity edge; a pending auto-sync only runs if
    /// the generation it was scheduled under is still current
    auto_generation: u64,
}

impl Flight {
    fn is_current(&self, cycle: u64) -> bool {
        self.active == Some(cycle)
    }

    fn start(&mut self) -> u64 {
        self.next_cycle += 1;
        self.active = Some(self.next_cycle);
        self.next_cycle
    }

    fn abandon(&mut self, reason: AbortReason) -> Option<u64> {
        let cycle = self.active.take()?;
        self.abandoned.insert(cycle, reason);
        Some(cycle)
    }

    /// Claim the reason an abandoned cycle was dropped; each cycle asks once
    fn take_abort_reason(&mut self, cycle: u64) -> AbortReason {
        self.abandoned
            .remove(&cycle)
            .unwrap_or(AbortReason::Reset)
    }
}

struct Cycle {
    id: u64,
    lines: Vec<CartLine>,
}

enum Begin {
    Started(Cycle),
    Empty,
    Offline,
}

enum Step {
    Retry(Duration),
    Stop(SyncError),
}

struct Inner<E> {
    endpoint: E,
    cart: CartManager,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
    state: StateCell<SyncState>,
    flight: Mutex<Flight>,
}

impl<E> Inner<E> {
    fn flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives cart submissions and publishes `SyncState`.
///
/// Clones share the same state machine.
pub struct SyncOrchestrator<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for SyncOrchestrator<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: SyncEndpoint + 'static> SyncOrchestrator<E> {
    /// Create an orchestrator in the idle state
    pub fn new(
        endpoint: E,
        cart: CartManager,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint,
                cart,
                connectivity,
                config,
                state: StateCell::new(SyncState::default()),
                flight: Mutex::new(Flight::default()),
            }),
        }
    }

    /// Current sync state
    pub fn state(&self) -> SyncState {
        self.inner.state.current()
    }

    /// Observe every state transition, in order
    pub fn subscribe(&self, callback: impl Fn(&SyncState) + Send + Sync + 'static) -> Subscription {
        self.inner.state.subscribe(callback)
    }

    /// Check whether a cycle is active
    pub fn is_active(&self) -> bool {
        self.inner.flight().active.is_some()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.inner.connectivity
    }

    /// Run one sync cycle and wait for it to settle.
    ///
    /// Returns `AlreadyRunning` without touching the state when another
    /// cycle is active, and fails with `SyncError::Offline` without calling
    /// the endpoint when offline.
    pub async fn sync(&self) -> SyncResult<SyncOutcome> {
        self.run_cycle(Trigger::Manual).await
    }

    /// Sync automatically whenever connectivity comes back.
    ///
    /// Dropping the returned subscription stops automatic syncing.
    pub fn start_auto_sync(&self) -> SyncResult<Subscription> {
        let runtime = Handle::try_current().map_err(|e| SyncError::Runtime(e.to_string()))?;
        let weak = Arc::downgrade(&self.inner);

        Ok(self.inner.connectivity.subscribe(move |online| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let orchestrator = SyncOrchestrator { inner };
            if online {
                orchestrator.on_reconnect(&runtime);
            } else {
                orchestrator.on_disconnect();
            }
        }))
    }

    /// Force the state back to idle.
    ///
    /// An active cycle is abandoned: its in-flight request is not cancelled,
    /// but whatever it returns is discarded.
    pub fn reset_state(&self) {
        let inner = &self.inner;
        inner.state.update(|state| {
            if let Some(cycle) = inner.flight().abandon(AbortReason::Reset) {
                tracing::info!("Sync cycle {} abandoned by reset", cycle);
            }
            state.enter(SyncStatus::Idle, READY_MESSAGE);
        });
    }

    /// Empty the cart once the user has seen the sync confirmation.
    ///
    /// The state moves to idle unless a cycle is active, in which case that
    /// cycle keeps ownership of the state.
    pub fn clear_cart_after_sync(&self) {
        let inner = &self.inner;
        inner.cart.clear_cart();
        inner.state.update_if(|state| {
            if inner.flight().active.is_some() {
                return None;
            }
            state.enter(SyncStatus::Idle, CART_CLEARED_MESSAGE);
            Some(())
        });
    }

    async fn run_cycle(&self, trigger: Trigger) -> SyncResult<SyncOutcome> {
        let cycle = match self.begin(trigger) {
            None => {
                tracing::debug!("Sync requested while a cycle is active; ignoring");
                return Ok(SyncOutcome::AlreadyRunning);
            }
            Some(Begin::Offline) => {
                tracing::warn!("Sync refused: offline");
                return Err(SyncError::Offline);
            }
            Some(Begin::Empty) => {
                tracing::debug!("Sync skipped: cart is empty");
                return Ok(SyncOutcome::NothingToSync);
            }
            Some(Begin::Started(cycle)) => cycle,
        };

        tracing::info!(
            "Sync cycle {} started with {} lines",
            cycle.id,
            cycle.lines.len()
        );

        let mut retry = 0;
        loop {
            let error = match self.inner.endpoint.submit(&cycle.lines).await {
                Ok(receipt) => return self.finish(&cycle, receipt.order_id),
                Err(error) => error,
            };

            tracing::warn!(
                "Sync cycle {} attempt {} failed: {}",
                cycle.id,
                retry + 1,
                error
            );

            match self.after_failure(&cycle, retry, error) {
                Step::Retry(delay) => {
                    retry += 1;
                    tracing::info!(
                        "Sync cycle {} retrying in {:?} ({}/{})",
                        cycle.id,
                        delay,
                        retry,
                        self.inner.config.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    self.resume(&cycle)?;
                }
                Step::Stop(error) => return Err(error),
            }
        }
    }

    /// Apply the start guards and, if they pass, claim the flight slot.
    ///
    /// `None` means another cycle is active and nothing was changed.
    fn begin(&self, trigger: Trigger) -> Option<Begin> {
        let inner = &self.inner;
        inner.state.update_if(|state| {
            let mut flight = inner.flight();
            if flight.active.is_some() {
                return None;
            }

            if !inner.connectivity.is_online() {
                state.failed(OFFLINE_MESSAGE);
                return Some(Begin::Offline);
            }

            let lines = inner.cart.lines();
            if lines.is_empty() {
                state.succeeded(0, Utc::now());
                state.message = EMPTY_CART_MESSAGE.to_string();
                return Some(Begin::Empty);
            }

            let id = flight.start();
            let message = match trigger {
                Trigger::Manual => format!("Syncing {} items...", lines.len()),
                Trigger::Reconnect => RECONNECT_MESSAGE.to_string(),
            };
            state.syncing(message, 0);
            Some(Begin::Started(Cycle { id, lines }))
        })
    }

    /// Decide what follows a failed attempt and publish the transition
    fn after_failure(&self, cycle: &Cycle, retry: u32, error: EndpointError) -> Step {
        let inner = &self.inner;
        let policy = &inner.config.retry;

        let decided = inner.state.update_if(|state| {
            let mut flight = inner.flight();
            if !flight.is_current(cycle.id) {
                return None;
            }

            if !inner.connectivity.is_online() {
                flight.active = None;
                state.failed(CONNECTION_LOST_MESSAGE);
                return Some(Step::Stop(SyncError::ConnectionLost));
            }

            if retry < policy.max_retries {
                let next = retry + 1;
                state.syncing(
                    format!("Syncing (attempt {}/{})...", next, policy.max_retries),
                    next,
                );
                return Some(Step::Retry(policy.delay_for(next)));
            }

            flight.active = None;
            let attempts = retry + 1;
            state.failed(format!("Sync failed after {} attempts", attempts));
            Some(Step::Stop(SyncError::MaxRetriesExceeded {
                attempts,
                last_error: error,
            }))
        });

        decided.unwrap_or_else(|| {
            let reason = inner.flight().take_abort_reason(cycle.id);
            tracing::debug!("Sync cycle {} no longer active; dropping failure", cycle.id);
            Step::Stop(reason.into_error())
        })
    }

    /// Re-check the guards after a backoff wait
    fn resume(&self, cycle: &Cycle) -> SyncResult<()> {
        let inner = &self.inner;
        let lost = inner.state.update_if(|state| {
            let mut flight = inner.flight();
            if !flight.is_current(cycle.id) || inner.connectivity.is_online() {
                return None;
            }
            flight.active = None;
            state.failed(CONNECTION_LOST_MESSAGE);
            Some(())
        });

        if lost.is_some() {
            tracing::warn!("Sync cycle {} stopped: connection lost", cycle.id);
            return Err(SyncError::ConnectionLost);
        }

        let mut flight = inner.flight();
        if flight.is_current(cycle.id) {
            Ok(())
        } else {
            Err(flight.take_abort_reason(cycle.id).into_error())
        }
    }

    fn finish(&self, cycle: &Cycle, order_id: Option<OrderId>) -> SyncResult<SyncOutcome> {
        let inner = &self.inner;
        let item_count = cycle.lines.len();

        let finished = inner.state.update_if(|state| {
            let mut flight = inner.flight();
            if !flight.is_current(cycle.id) {
                return None;
            }
            flight.active = None;
            state.succeeded(item_count, Utc::now());
            Some(())
        });

        match finished {
            Some(()) => {
                tracing::info!(
                    "Sync cycle {} succeeded: {} lines, order {}",
                    cycle.id,
                    item_count,
                    order_id.as_ref().map_or("unknown", OrderId::as_str)
                );
                Ok(SyncOutcome::Synced {
                    order_id,
                    item_count,
                })
            }
            None => {
                let reason = inner.flight().take_abort_reason(cycle.id);
                tracing::warn!(
                    "Discarding late success of abandoned sync cycle {} (order {})",
                    cycle.id,
                    order_id.as_ref().map_or("unknown", OrderId::as_str)
                );
                Err(reason.into_error())
            }
        }
    }

    fn on_reconnect(&self, runtime: &Handle) {
        let generation = {
            let mut flight = self.inner.flight();
            flight.auto_generation += 1;
            if flight.active.is_some() {
                tracing::debug!("Reconnected during an active cycle; no auto-sync");
                return;
            }
            flight.auto_generation
        };

        if self.inner.cart.is_empty() {
            tracing::debug!("Reconnected with an empty cart; no auto-sync");
            return;
        }

        let settle = self.inner.config.settle_delay;
        tracing::info!("Reconnected; auto-sync scheduled in {:?}", settle);

        let orchestrator = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(settle).await;
            if !orchestrator.auto_sync_still_wanted(generation) {
                tracing::debug!("Auto-sync cancelled; conditions changed during settle delay");
                return;
            }
            if let Err(e) = orchestrator.run_cycle(Trigger::Reconnect).await {
                tracing::warn!("Auto-sync failed: {}", e);
            }
        });
    }

    fn auto_sync_still_wanted(&self, generation: u64) -> bool {
        let current = {
            let flight = self.inner.flight();
            flight.auto_generation == generation && flight.active.is_none()
        };
        current && self.inner.connectivity.is_online() && !self.inner.cart.is_empty()
    }

    fn on_disconnect(&self) {
        let inner = &self.inner;
        let aborted = inner.state.update_if(|state| {
            let mut flight = inner.flight();
            flight.auto_generation += 1;
            let cycle = flight.abandon(AbortReason::ConnectionLost)?;
            state.failed(CONNECTION_LOST_MESSAGE);
            Some(cycle)
        });

        if let Some(cycle) = aborted {
            tracing::warn!("Sync cycle {} aborted: connection lost", cycle);
        }
    }
}

impl<E> std::fmt::Debug for SyncOrchestrator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("state", &self.inner.state)
            .field("flight", &*self.inner.flight())
            .finish()
    }
}
