//! Observable sync state.
//!
//! `SyncState` is the single record that describes what the orchestrator is
//! doing. Each transition replaces the status and message while the last
//! successful sync time is carried forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the sync state machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Nothing running
    #[default]
    Idle,
    /// A cycle is in flight
    Syncing,
    /// The last cycle completed
    Success,
    /// The last cycle gave up or was refused
    Error,
}

impl SyncStatus {
    /// Get a human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Success => "success",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Message shown before any sync has run, and after a reset.
pub const READY_MESSAGE: &str = "Ready to sync";

/// Snapshot of the orchestrator's state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub status: SyncStatus,
    pub message: String,
    /// Completion time of the most recent successful cycle
    pub last_success: Option<DateTime<Utc>>,
    /// Number of lines sent by the last successful cycle
    pub synced_item_count: Option<usize>,
    /// Retries performed by the running cycle, `0` on the first attempt
    pub retry_attempt: Option<u32>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::idle(READY_MESSAGE)
    }
}

impl SyncState {
    /// Idle state with no history
    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Idle,
            message: message.into(),
            last_success: None,
            synced_item_count: None,
            retry_attempt: None,
        }
    }

    /// Check if a cycle is in flight
    pub fn is_syncing(&self) -> bool {
        self.status == SyncStatus::Syncing
    }

    /// Move to `status`, keeping only the last success time
    pub(crate) fn enter(&mut self, status: SyncStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
        self.synced_item_count = None;
        self.retry_attempt = None;
    }

    pub(crate) fn syncing(&mut self, message: impl Into<String>, retry_attempt: u32) {
        self.enter(SyncStatus::Syncing, message);
        self.retry_attempt = Some(retry_attempt);
    }

    pub(crate) fn succeeded(&mut self, item_count: usize, at: DateTime<Utc>) {
        self.enter(
            SyncStatus::Success,
            format!("Sync succeeded! {} items sent.", item_count),
        );
        self.synced_item_count = Some(item_count);
        self.last_success = Some(at);
    }

    pub(crate) fn failed(&mut self, message: impl Into<String>) {
        self.enter(SyncStatus::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ready() {
        let state = SyncState::default();
        assert_eq!(state.status, SyncStatus::Idle);
        assert_eq!(state.message, READY_MESSAGE);
        assert!(state.last_success.is_none());
    }

    #[test]
    fn test_last_success_survives_later_transitions() {
        let mut state = SyncState::default();
        let at = Utc::now();
        state.succeeded(3, at);
        assert_eq!(state.synced_item_count, Some(3));
        assert_eq!(state.message, "Sync succeeded! 3 items sent.");

        state.syncing("Syncing 1 items...", 0);
        assert_eq!(state.synced_item_count, None);
        assert_eq!(state.retry_attempt, Some(0));

        state.failed("Sync failed after 4 attempts");
        assert_eq!(state.status, SyncStatus::Error);
        assert_eq!(state.retry_attempt, None);
        assert_eq!(state.last_success, Some(at));
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut state = SyncState::default();
        state.syncing("Syncing 2 items...", 1);
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["status"], "syncing");
        assert_eq!(json["retryAttempt"], 1);
        assert!(json["lastSuccess"].is_null());
    }
}
