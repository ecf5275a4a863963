// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process backend for tests and embedded deployments.
//!
//! Implements both remote traits over mutex-guarded vectors, with a
//! settable identity and append-failure injection so connectivity loss can
//! be simulated deterministically.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{EventStore, IdentityProvider, LocalStore};
use crate::error::{ClockError, Result};
use crate::types::{EntryType, TimeEvent, UserIdentity};

/// In-memory identity provider and event store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    identity: Mutex<Option<UserIdentity>>,
    events: Mutex<Vec<TimeEvent>>,
    fail_appends: AtomicBool,
}

impl MemoryBackend {
    /// Empty store with no signed-in user.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signed-in identity.
    pub fn set_identity(&self, identity: UserIdentity) {
        *self.identity.lock().unwrap() = Some(identity);
    }

    /// Sign out.
    pub fn clear_identity(&self) {
        *self.identity.lock().unwrap() = None;
    }

    /// While set, every `append_event` fails with a remote write error.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Seed an event directly, bypassing failure injection.
    pub fn push_event(&self, event: TimeEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Snapshot of all stored events, in insertion order.
    pub fn events(&self) -> Vec<TimeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Drop all stored events. Simulates a remote store that never saw the
    /// session (e.g. writes lost while offline).
    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        Ok(self.identity.lock().unwrap().clone())
    }
}

#[async_trait]
impl EventStore for MemoryBackend {
    async fn append_event(&self, event: &TimeEvent) -> Result<TimeEvent> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(ClockError::RemoteWrite("injected failure".to_string()));
        }
        debug!(entry_type = %event.entry_type, "event appended (memory)");
        self.events.lock().unwrap().push(event.clone());
        Ok(event.clone())
    }

    async fn latest_event_of_type(
        &self,
        user_id: &str,
        company_id: &str,
        entry_type: EntryType,
        before: Option<DateTime<Utc>>,
    ) -> Result<Option<TimeEvent>> {
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && e.company_id == company_id
                    && e.entry_type == entry_type
                    && before.is_none_or(|cutoff| e.entry_time < cutoff)
            })
            .max_by_key(|e| e.entry_time)
            .cloned())
    }
}

/// In-memory durable store double.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    /// True when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }
}
