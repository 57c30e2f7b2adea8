//! Observable single-value state cells.
//!
//! A `StateCell` holds exactly one current value and notifies every
//! subscriber synchronously each time the value is written. Notifications
//! are delivered in write order and are never skipped or coalesced: a write
//! issued from inside a subscriber callback is queued and delivered once the
//! current notification round has finished. A panicking subscriber is
//! logged and skipped; the remaining subscribers and queued values are still
//! delivered.
//!
//! # Example
//!
//! ```
//! use cart_sync::cell::StateCell;
//! use std::sync::{Arc, Mutex};
//!
//! let cell = StateCell::new(0u32);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let subscription = cell.subscribe(move |value| sink.lock().unwrap().push(*value));
//!
//! cell.set(1);
//! cell.update(|value| *value += 1);
//! subscription.unsubscribe();
//! cell.set(10);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! assert_eq!(cell.current(), 10);
//! ```

use std::collections::VecDeque;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Observer<T> {
    id: u64,
    callback: Callback<T>,
}

struct CellState<T> {
    value: T,
    version: u64,
    observers: Vec<Observer<T>>,
    next_observer: u64,
    /// Values written but not yet delivered
    pending: VecDeque<T>,
    /// Whether some caller is currently draining `pending`
    delivering: bool,
}

/// A shared, observable value with a single current state.
///
/// Clones share the same underlying value and subscribers.
pub struct StateCell<T> {
    shared: Arc<Mutex<CellState<T>>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("StateCell")
            .field("value", &state.value)
            .field("version", &state.version)
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl<T: Clone + Send + 'static> StateCell<T> {
    /// Create a cell holding `value`
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(CellState {
                value,
                version: 0,
                observers: Vec::new(),
                next_observer: 0,
                pending: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    /// Get a copy of the current value
    pub fn current(&self) -> T {
        lock(&self.shared).value.clone()
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.shared).value)
    }

    /// Number of writes since creation
    pub fn version(&self) -> u64 {
        lock(&self.shared).version
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared).observers.len()
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.update(move |current| *current = value);
    }

    /// Modify the value in place and notify subscribers.
    ///
    /// The closure runs under the cell's lock and must not touch this cell.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut state = lock(&self.shared);
        let result = f(&mut state.value);
        self.publish(state);
        result
    }

    /// Conditionally modify the value.
    ///
    /// Subscribers are notified only when the closure returns `Some`; a
    /// closure returning `None` must leave the value untouched. The closure
    /// runs under the cell's lock and must not touch this cell.
    pub fn update_if<R>(&self, f: impl FnOnce(&mut T) -> Option<R>) -> Option<R> {
        let mut state = lock(&self.shared);
        let result = f(&mut state.value)?;
        self.publish(state);
        Some(result)
    }

    /// Register a callback invoked with every subsequent value.
    ///
    /// The current value is not replayed. The returned handle removes the
    /// callback when unsubscribed or dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut state = lock(&self.shared);
            let id = state.next_observer;
            state.next_observer += 1;
            state.observers.push(Observer {
                id,
                callback: Arc::new(callback),
            });
            id
        };

        let weak: Weak<Mutex<CellState<T>>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                lock(&shared).observers.retain(|observer| observer.id != id);
            }
        })
    }

    fn publish<'a>(&'a self, mut state: MutexGuard<'a, CellState<T>>) {
        state.version += 1;
        let value = state.value.clone();
        state.pending.push_back(value);

        if state.delivering {
            return;
        }
        state.delivering = true;

        loop {
            let Some(value) = state.pending.pop_front() else {
                state.delivering = false;
                break;
            };
            let callbacks: Vec<Callback<T>> = state
                .observers
                .iter()
                .map(|observer| Arc::clone(&observer.callback))
                .collect();
            drop(state);

            for callback in &callbacks {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(&value))) {
                    tracing::error!("State subscriber panicked: {}", panic_message(&*payload));
                }
            }

            state = lock(&self.shared);
        }
    }
}

fn lock<T>(shared: &Mutex<CellState<T>>) -> MutexGuard<'_, CellState<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle unsubscribes; call `detach` to keep the callback for
/// the lifetime of the cell.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the callback. Other subscribers are unaffected.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered for as long as the cell lives
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
