//! Integration tests for the sync orchestrator
//!
//! These tests drive the orchestrator against a scripted endpoint on a
//! paused Tokio clock, so retry backoff and reconnect settle delays run
//! instantly while keeping their relative ordering.

use cart_sync::orchestrator::{
    CART_CLEARED_MESSAGE, CONNECTION_LOST_MESSAGE, EMPTY_CART_MESSAGE, OFFLINE_MESSAGE,
    RECONNECT_MESSAGE,
};
use cart_sync::{
    Backoff, CartManager, ConnectivityMonitor, EndpointError, SubmitReceipt, Subscription,
    SyncConfig, SyncEndpoint, SyncError, SyncOrchestrator, SyncOutcome, SyncState, SyncStatus,
};
use model::{CartLine, Price};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use store::MemoryStore;
use tokio::time::Instant;

/// Endpoint double that fails a set number of times, then succeeds
#[derive(Clone)]
struct TestEndpoint {
    log: Arc<EndpointLog>,
}

struct EndpointLog {
    failures_left: AtomicUsize,
    latency: Duration,
    submissions: Mutex<Vec<Vec<CartLine>>>,
}

impl TestEndpoint {
    fn new(failures: usize, latency: Duration) -> Self {
        Self {
            log: Arc::new(EndpointLog {
                failures_left: AtomicUsize::new(failures),
                latency,
                submissions: Mutex::new(Vec::new()),
            }),
        }
    }

    fn succeeding() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn failing() -> Self {
        Self::new(usize::MAX, Duration::ZERO)
    }

    fn calls(&self) -> usize {
        self.log.submissions.lock().unwrap().len()
    }

    fn submissions(&self) -> Vec<Vec<CartLine>> {
        self.log.submissions.lock().unwrap().clone()
    }
}

impl SyncEndpoint for TestEndpoint {
    async fn submit(&self, lines: &[CartLine]) -> Result<SubmitReceipt, EndpointError> {
        let call = {
            let mut submissions = self.log.submissions.lock().unwrap();
            submissions.push(lines.to_vec());
            submissions.len()
        };

        if !self.log.latency.is_zero() {
            tokio::time::sleep(self.log.latency).await;
        }

        if self.log.failures_left.load(Ordering::SeqCst) > 0 {
            self.log.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(EndpointError::Network(format!("call {} refused", call)));
        }
        Ok(SubmitReceipt::new(format!("order-{}", call)))
    }
}

/// Test harness wiring an orchestrator to an in-memory cart
struct Harness {
    orchestrator: SyncOrchestrator<TestEndpoint>,
    endpoint: TestEndpoint,
    cart: CartManager,
    connectivity: ConnectivityMonitor,
    states: Arc<Mutex<Vec<SyncState>>>,
    _recorder: Subscription,
}

impl Harness {
    async fn new(endpoint: TestEndpoint, online: bool) -> Self {
        Self::with_config(endpoint, online, SyncConfig::default()).await
    }

    async fn with_config(endpoint: TestEndpoint, online: bool, config: SyncConfig) -> Self {
        let cart = CartManager::open(Arc::new(MemoryStore::new())).await;
        let connectivity = ConnectivityMonitor::new(online);
        let orchestrator = SyncOrchestrator::new(
            endpoint.clone(),
            cart.clone(),
            connectivity.clone(),
            config,
        );

        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        let recorder = orchestrator.subscribe(move |state| sink.lock().unwrap().push(state.clone()));

        Self {
            orchestrator,
            endpoint,
            cart,
            connectivity,
            states,
            _recorder: recorder,
        }
    }

    fn add(&self, product_id: u64, price: u64, quantity: u32) {
        self.cart.add_to_cart(CartLine::new(
            product_id,
            format!("Item {}", product_id),
            Price::from_units(price),
            quantity,
        ));
    }

    fn statuses(&self) -> Vec<SyncStatus> {
        self.states.lock().unwrap().iter().map(|s| s.status).collect()
    }

    fn messages(&self) -> Vec<String> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.message.clone())
            .collect()
    }
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

// =========================================================================
// Guards
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_syncs_make_one_request() {
    let h = Harness::new(TestEndpoint::new(0, Duration::from_millis(100)), true).await;
    h.add(1, 10, 2);

    let (first, second) = tokio::join!(h.orchestrator.sync(), h.orchestrator.sync());

    assert!(matches!(
        first,
        Ok(SyncOutcome::Synced { item_count: 1, .. })
    ));
    assert_eq!(second, Ok(SyncOutcome::AlreadyRunning));
    assert_eq!(h.endpoint.calls(), 1);
    // The refused call published nothing.
    assert_eq!(h.statuses(), vec![SyncStatus::Syncing, SyncStatus::Success]);
}

#[tokio::test(start_paused = true)]
async fn test_offline_sync_never_calls_endpoint() {
    let h = Harness::new(TestEndpoint::succeeding(), false).await;
    h.add(1, 10, 1);

    let result = h.orchestrator.sync().await;

    assert_eq!(result, Err(SyncError::Offline));
    assert_eq!(h.endpoint.calls(), 0);
    let state = h.orchestrator.state();
    assert_eq!(state.status, SyncStatus::Error);
    assert_eq!(state.message, OFFLINE_MESSAGE);
    assert!(!h.orchestrator.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_empty_cart_succeeds_without_request() {
    let h = Harness::new(TestEndpoint::succeeding(), true).await;

    let result = h.orchestrator.sync().await;

    assert_eq!(result, Ok(SyncOutcome::NothingToSync));
    assert_eq!(h.endpoint.calls(), 0);
    let state = h.orchestrator.state();
    assert_eq!(state.status, SyncStatus::Success);
    assert_eq!(state.message, EMPTY_CART_MESSAGE);
}

// =========================================================================
// Retry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_bound_with_always_failing_endpoint() {
    let h = Harness::new(TestEndpoint::failing(), true).await;
    h.add(1, 10, 2);
    h.add(2, 5, 1);
    let started = Instant::now();

    let result = h.orchestrator.sync().await;

    match result {
        Err(SyncError::MaxRetriesExceeded {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 4);
            assert_eq!(last_error, EndpointError::Network("call 4 refused".into()));
        }
        other => panic!("Expected MaxRetriesExceeded, got {:?}", other),
    }
    assert_eq!(h.endpoint.calls(), 4);
    assert!(started.elapsed() >= Duration::from_secs(6));

    let retries: Vec<Option<u32>> = h
        .states
        .lock()
        .unwrap()
        .iter()
        .map(|s| s.retry_attempt)
        .collect();
    assert_eq!(retries, vec![Some(0), Some(1), Some(2), Some(3), None]);

    let messages = h.messages();
    assert_eq!(messages[0], "Syncing 2 items...");
    assert_eq!(messages[1], "Syncing (attempt 1/3)...");
    assert_eq!(messages[4], "Sync failed after 4 attempts");
    assert_eq!(h.orchestrator.state().status, SyncStatus::Error);

    // A failed sync leaves the cart alone.
    assert_eq!(h.cart.item_count(), 3);
    assert!(!h.orchestrator.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_fails_twice_then_succeeds() {
    let h = Harness::new(TestEndpoint::new(2, Duration::ZERO), true).await;
    h.add(1, 10, 1);
    h.add(2, 10, 1);
    h.add(3, 10, 1);

    let result = h.orchestrator.sync().await;

    assert_eq!(
        result,
        Ok(SyncOutcome::Synced {
            order_id: Some(cart_sync::OrderId::new("order-3")),
            item_count: 3,
        })
    );
    assert_eq!(h.endpoint.calls(), 3);

    let state = h.orchestrator.state();
    assert_eq!(state.status, SyncStatus::Success);
    assert_eq!(state.synced_item_count, Some(3));
    assert!(state.last_success.is_some());
    assert_eq!(state.message, "Sync succeeded! 3 items sent.");
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_delays() {
    let config = SyncConfig::new()
        .with_retry_delay(Duration::from_secs(1))
        .with_backoff(Backoff::Exponential {
            max_delay: Duration::from_secs(3),
        });
    let h = Harness::with_config(TestEndpoint::failing(), true, config).await;
    h.add(1, 1, 1);
    let started = Instant::now();

    let _ = h.orchestrator.sync().await;

    // 1s + 2s + 3s (capped)
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(6));
    assert!(elapsed < Duration::from_secs(7));
    assert_eq!(h.endpoint.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_is_isolated_from_later_mutations() {
    let h = Harness::new(TestEndpoint::new(0, Duration::from_secs(1)), true).await;
    h.add(1, 10, 1);
    h.add(2, 10, 1);

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.sync().await });

    advance(500).await;
    h.add(3, 10, 1);
    h.cart.update_quantity(1, 7);

    let result = task.await.unwrap();
    assert!(matches!(
        result,
        Ok(SyncOutcome::Synced { item_count: 2, .. })
    ));

    let sent = &h.endpoint.submissions()[0];
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].quantity, 1);
    assert_eq!(h.orchestrator.state().synced_item_count, Some(2));
    assert_eq!(h.cart.line_count(), 3);
}

// =========================================================================
// Connectivity
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reconnect_triggers_one_auto_sync_after_settle_delay() {
    let h = Harness::new(TestEndpoint::succeeding(), false).await;
    h.add(1, 10, 2);
    let _auto = h.orchestrator.start_auto_sync().unwrap();

    h.connectivity.set_online(true);

    advance(1900).await;
    assert_eq!(h.endpoint.calls(), 0);

    advance(200).await;
    advance(1000).await;
    assert_eq!(h.endpoint.calls(), 1);

    advance(10_000).await;
    assert_eq!(h.endpoint.calls(), 1);

    assert!(h.messages().contains(&RECONNECT_MESSAGE.to_string()));
    assert_eq!(h.orchestrator.state().status, SyncStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_flapping_connection_runs_only_latest_auto_sync() {
    let h = Harness::new(TestEndpoint::succeeding(), false).await;
    h.add(1, 10, 1);
    let _auto = h.orchestrator.start_auto_sync().unwrap();

    h.connectivity.set_online(true);
    advance(1000).await;
    h.connectivity.set_online(false);
    advance(500).await;
    h.connectivity.set_online(true);

    // The first schedule would have fired at 2.0s; only the second, due at
    // 3.5s, may run.
    advance(1900).await;
    assert_eq!(h.endpoint.calls(), 0);

    advance(200).await;
    advance(1000).await;
    assert_eq!(h.endpoint.calls(), 1);

    advance(10_000).await;
    assert_eq!(h.endpoint.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_sync_during_settle_delay_suppresses_auto_sync() {
    let h = Harness::new(TestEndpoint::new(0, Duration::from_secs(3)), false).await;
    h.add(1, 10, 1);
    let _auto = h.orchestrator.start_auto_sync().unwrap();

    h.connectivity.set_online(true);
    advance(1000).await;

    // Still in flight when the settle delay runs out at 2.0s.
    let orchestrator = h.orchestrator.clone();
    let manual = tokio::spawn(async move { orchestrator.sync().await });

    advance(1100).await;
    assert!(h.orchestrator.is_active());
    assert_eq!(h.endpoint.calls(), 1);

    assert!(matches!(
        manual.await.unwrap(),
        Ok(SyncOutcome::Synced { item_count: 1, .. })
    ));
    advance(10_000).await;
    assert_eq!(h.endpoint.calls(), 1);
    assert!(!h.messages().contains(&RECONNECT_MESSAGE.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_while_cycle_active_schedules_nothing() {
    let h = Harness::new(TestEndpoint::new(0, Duration::from_secs(3)), true).await;
    h.add(1, 10, 1);

    let orchestrator = h.orchestrator.clone();
    let manual = tokio::spawn(async move { orchestrator.sync().await });
    advance(500).await;

    // The drop happens before auto-sync is listening, so the cycle keeps
    // running and is still active when connectivity returns.
    h.connectivity.set_online(false);
    let _auto = h.orchestrator.start_auto_sync().unwrap();
    h.connectivity.set_online(true);
    assert!(h.orchestrator.is_active());

    assert!(matches!(
        manual.await.unwrap(),
        Ok(SyncOutcome::Synced { .. })
    ));
    advance(10_000).await;
    assert_eq!(h.endpoint.calls(), 1);
    assert!(!h.messages().contains(&RECONNECT_MESSAGE.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_flap_during_cycle_replaces_it_with_one_auto_cycle() {
    let h = Harness::new(TestEndpoint::new(0, Duration::from_secs(3)), true).await;
    h.add(1, 10, 1);
    let _auto = h.orchestrator.start_auto_sync().unwrap();

    let orchestrator = h.orchestrator.clone();
    let manual = tokio::spawn(async move { orchestrator.sync().await });

    advance(500).await;
    h.connectivity.set_online(false);
    assert!(!h.orchestrator.is_active());
    advance(1000).await;
    h.connectivity.set_online(true);

    // The abandoned request lands at 3.0s and is discarded; the auto cycle
    // starts at 3.5s, never alongside another active cycle.
    assert_eq!(manual.await.unwrap(), Err(SyncError::ConnectionLost));
    assert_eq!(h.orchestrator.state().message, CONNECTION_LOST_MESSAGE);
    assert_eq!(h.endpoint.calls(), 1);

    advance(10_000).await;
    assert_eq!(h.endpoint.calls(), 2);
    assert!(h.messages().contains(&RECONNECT_MESSAGE.to_string()));
    assert_eq!(h.orchestrator.state().status, SyncStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_with_empty_cart_does_nothing() {
    let h = Harness::new(TestEndpoint::succeeding(), false).await;
    let _auto = h.orchestrator.start_auto_sync().unwrap();

    h.connectivity.set_online(true);
    advance(5000).await;

    assert_eq!(h.endpoint.calls(), 0);
    assert!(h.states.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_auto_sync_subscription_stops_it() {
    let h = Harness::new(TestEndpoint::succeeding(), false).await;
    h.add(1, 10, 1);
    let auto = h.orchestrator.start_auto_sync().unwrap();
    auto.unsubscribe();

    h.connectivity.set_online(true);
    advance(5000).await;

    assert_eq!(h.endpoint.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connection_drop_aborts_active_cycle() {
    let h = Harness::new(TestEndpoint::new(0, Duration::from_secs(1)), true).await;
    h.add(1, 10, 1);
    let _auto = h.orchestrator.start_auto_sync().unwrap();

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.sync().await });

    advance(500).await;
    h.connectivity.set_online(false);

    let state = h.orchestrator.state();
    assert_eq!(state.status, SyncStatus::Error);
    assert_eq!(state.message, CONNECTION_LOST_MESSAGE);
    assert!(!h.orchestrator.is_active());

    // The request still completes, but its success is discarded.
    assert_eq!(task.await.unwrap(), Err(SyncError::ConnectionLost));
    assert_eq!(h.orchestrator.state().status, SyncStatus::Error);
    assert!(h.orchestrator.state().last_success.is_none());
    assert_eq!(h.endpoint.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connection_drop_during_backoff_stops_retries() {
    let h = Harness::new(TestEndpoint::failing(), true).await;
    h.add(1, 10, 1);

    let orchestrator = h.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.sync().await });

    advance(100).await;
    h.connectivity.set_online(false);

    assert_eq!(task.await.unwrap(), Err(SyncError::ConnectionLost));
    assert_eq!(h.endpoint.calls(), 1);
    assert_eq!(h.orchestrator.state().message, CONNECTION_LOST_MESSAGE);
}

// =========================================================================
// Reset and clear
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reset_discards_late_result() {
    let h = Harness::new(TestEndpoint::new(0, Duration::from_secs(1)), true).await;
    h.add(1, 10, 1);

    let orchestrator = h.orchestrator.clone();
    let first = tokio::spawn(async move { orchestrator.sync().await });

    advance(500).await;
    h.orchestrator.reset_state();
    assert_eq!(h.orchestrator.state(), SyncState::default());
    assert!(!h.orchestrator.is_active());

    // A fresh cycle may start while the abandoned request is still out.
    let orchestrator = h.orchestrator.clone();
    let second = tokio::spawn(async move { orchestrator.sync().await });
    advance(100).await;

    assert_eq!(first.await.unwrap(), Err(SyncError::Reset));
    assert_eq!(h.orchestrator.state().status, SyncStatus::Syncing);

    assert!(matches!(
        second.await.unwrap(),
        Ok(SyncOutcome::Synced { .. })
    ));
    assert_eq!(h.orchestrator.state().status, SyncStatus::Success);
    assert_eq!(h.endpoint.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_each_abandoned_cycle_reports_its_own_reason() {
    let config = SyncConfig::default().with_settle_delay(Duration::from_secs(60));
    let h = Harness::with_config(TestEndpoint::new(0, Duration::from_secs(3)), true, config).await;
    h.add(1, 10, 1);
    let _auto = h.orchestrator.start_auto_sync().unwrap();

    let orchestrator = h.orchestrator.clone();
    let dropped = tokio::spawn(async move { orchestrator.sync().await });
    advance(500).await;
    h.connectivity.set_online(false);
    advance(500).await;
    h.connectivity.set_online(true);

    let orchestrator = h.orchestrator.clone();
    let reset = tokio::spawn(async move { orchestrator.sync().await });
    advance(500).await;
    h.orchestrator.reset_state();

    // The first cycle returns after the second was abandoned.
    assert_eq!(dropped.await.unwrap(), Err(SyncError::ConnectionLost));
    assert_eq!(reset.await.unwrap(), Err(SyncError::Reset));
    assert_eq!(h.orchestrator.state(), SyncState::default());
    assert_eq!(h.endpoint.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cart_after_sync() {
    let h = Harness::new(TestEndpoint::succeeding(), true).await;
    h.add(1, 10, 3);
    h.orchestrator.sync().await.unwrap();
    let synced_at = h.orchestrator.state().last_success;

    h.orchestrator.clear_cart_after_sync();

    assert!(h.cart.is_empty());
    let state = h.orchestrator.state();
    assert_eq!(state.status, SyncStatus::Idle);
    assert_eq!(state.message, CART_CLEARED_MESSAGE);
    assert_eq!(state.last_success, synced_at);
}

// =========================================================================
// Observers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_observers_see_all_transitions_and_unsubscribe_independently() {
    let h = Harness::new(TestEndpoint::new(1, Duration::ZERO), true).await;
    h.add(1, 10, 1);

    let other = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&other);
    let sub = h
        .orchestrator
        .subscribe(move |state| sink.lock().unwrap().push(state.status));

    h.orchestrator.sync().await.unwrap();
    sub.unsubscribe();
    h.orchestrator.reset_state();

    let expected = vec![SyncStatus::Syncing, SyncStatus::Syncing, SyncStatus::Success];
    assert_eq!(*other.lock().unwrap(), expected);

    let mut all = expected;
    all.push(SyncStatus::Idle);
    assert_eq!(h.statuses(), all);
}

#[tokio::test(start_paused = true)]
async fn test_observer_may_call_back_into_orchestrator() {
    let h = Harness::new(TestEndpoint::succeeding(), true).await;
    h.add(1, 10, 1);

    // Clear the cart as soon as a sync succeeds.
    let orchestrator = h.orchestrator.clone();
    let _sub = h.orchestrator.subscribe(move |state| {
        if state.status == SyncStatus::Success {
            orchestrator.clear_cart_after_sync();
        }
    });

    h.orchestrator.sync().await.unwrap();

    assert!(h.cart.is_empty());
    assert_eq!(
        h.statuses(),
        vec![SyncStatus::Syncing, SyncStatus::Success, SyncStatus::Idle]
    );
}

#[tokio::test(start_paused = true)]
async fn test_panicking_observer_does_not_wedge_the_cycle() {
    let h = Harness::new(TestEndpoint::succeeding(), true).await;
    h.add(1, 10, 1);
    let _faulty = h.orchestrator.subscribe(|state| {
        if state.status == SyncStatus::Syncing {
            panic!("observer failed");
        }
    });

    assert!(matches!(
        h.orchestrator.sync().await,
        Ok(SyncOutcome::Synced { .. })
    ));
    assert!(!h.orchestrator.is_active());
    assert_eq!(h.statuses(), vec![SyncStatus::Syncing, SyncStatus::Success]);

    // A second cycle can still start.
    assert!(matches!(
        h.orchestrator.sync().await,
        Ok(SyncOutcome::Synced { .. })
    ));
    assert_eq!(h.endpoint.calls(), 2);
}
