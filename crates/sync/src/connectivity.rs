//! Connectivity tracking.
//!
//! `ConnectivityMonitor` holds the current online flag and notifies
//! subscribers on every transition. Repeated reports of the same state are
//! ignored, so subscribers only ever see edges.
//!
//! The flag can be driven directly with `set_online` (tests, a `--offline`
//! switch) or by a background task polling a `Probe`.

use crate::cell::{StateCell, Subscription};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A reachability check
#[trait_variant::make(Send)]
pub trait Probe: Send + Sync {
    /// Return `true` when the remote side is reachable
    async fn check(&self) -> bool;
}

/// Observable online/offline flag
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    online: StateCell<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor with a known initial state
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: StateCell::new(initially_online),
        }
    }

    /// Current connectivity
    pub fn is_online(&self) -> bool {
        self.online.current()
    }

    /// Record the observed connectivity.
    ///
    /// Returns `true` when this changed the state; subscribers are notified
    /// only in that case.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self
            .online
            .update_if(|current| {
                if *current == online {
                    return None;
                }
                *current = online;
                Some(())
            })
            .is_some();

        if changed {
            if online {
                tracing::info!("Connectivity restored");
            } else {
                tracing::warn!("Connectivity lost");
            }
        }
        changed
    }

    /// Observe transitions. The current state is not replayed.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        self.online.subscribe(move |online| callback(*online))
    }

    /// Poll `probe` every `interval` and feed the result into this monitor.
    ///
    /// The task runs until the returned handle is aborted.
    pub fn spawn_probe<P>(&self, probe: P, interval: Duration) -> JoinHandle<()>
    where
        P: Probe + 'static,
    {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let online = probe.check().await;
                monitor.set_online(online);
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedProbe {
        answers: Mutex<VecDeque<bool>>,
    }

    impl ScriptedProbe {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
            }
        }
    }

    impl Probe for ScriptedProbe {
        async fn check(&self) -> bool {
            let mut answers = self.answers.lock().unwrap();
            if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().copied().unwrap_or(true)
            }
        }
    }

    fn record(monitor: &ConnectivityMonitor) -> (Arc<Mutex<Vec<bool>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = monitor.subscribe(move |online| sink.lock().unwrap().push(online));
        (seen, sub)
    }

    #[test]
    fn test_only_edges_are_reported() {
        let monitor = ConnectivityMonitor::new(true);
        let (seen, _sub) = record(&monitor);

        assert!(!monitor.set_online(true));
        assert!(monitor.set_online(false));
        assert!(!monitor.set_online(false));
        assert!(monitor.set_online(true));

        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
        assert!(monitor.is_online());
    }

    #[test]
    fn test_clones_share_state() {
        let monitor = ConnectivityMonitor::new(false);
        let other = monitor.clone();
        other.set_online(true);
        assert!(monitor.is_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_drives_monitor() {
        let monitor = ConnectivityMonitor::new(true);
        let (seen, _sub) = record(&monitor);

        let probe = ScriptedProbe::new(&[true, false, false, true]);
        let handle = monitor.spawn_probe(probe, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        handle.abort();

        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
        assert!(monitor.is_online());
    }
}
