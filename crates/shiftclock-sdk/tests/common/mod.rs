// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for the clock engine E2E tests.
//!
//! Provides a TestContext wiring a ShiftClock to in-memory collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};

use shiftclock_sdk::backend::memory::{MemoryBackend, MemoryLocalStore};
use shiftclock_sdk::{ClockConfig, EntryType, ShiftClock, TimeEvent, UserIdentity};

/// Default test subject.
pub const USER: &str = "u-1";
/// Default test tenant.
pub const COMPANY: &str = "acme";

/// A clock wired to shared in-memory collaborators, so tests can inspect
/// the remote log and the local store, and "restart" the client against
/// the same storage.
pub struct TestContext {
    pub clock: Arc<ShiftClock>,
    pub backend: Arc<MemoryBackend>,
    pub local: Arc<MemoryLocalStore>,
    pub config: ClockConfig,
}

impl TestContext {
    /// Signed-in context with test-sized intervals.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Signed-in context with the given configuration.
    pub fn with_config(config: ClockConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_identity(UserIdentity::new(USER, COMPANY));
        let local = Arc::new(MemoryLocalStore::new());
        let clock = Arc::new(ShiftClock::new(
            config.clone(),
            backend.clone(),
            backend.clone(),
            local.clone(),
        ));
        Self {
            clock,
            backend,
            local,
            config,
        }
    }

    /// Context with no signed-in user.
    pub fn signed_out() -> Self {
        let ctx = Self::new();
        ctx.backend.clear_identity();
        ctx
    }

    /// Simulate an app restart: a fresh ShiftClock over the same remote
    /// log and local store.
    pub fn reopen(&self) -> TestContext {
        TestContext {
            clock: Arc::new(ShiftClock::new(
                self.config.clone(),
                self.backend.clone(),
                self.backend.clone(),
                self.local.clone(),
            )),
            backend: self.backend.clone(),
            local: self.local.clone(),
            config: self.config.clone(),
        }
    }

    /// Seed a remote event for the default subject.
    pub fn seed_event(&self, entry_type: EntryType, at: DateTime<Utc>) {
        self.backend
            .push_event(TimeEvent::new(USER, COMPANY, entry_type, at));
    }

    /// Entry types of all remote events, in insertion order.
    pub fn remote_entry_types(&self) -> Vec<EntryType> {
        self.backend
            .events()
            .iter()
            .map(|e| e.entry_type)
            .collect()
    }
}

/// Configuration with intervals shrunk for tests.
pub fn test_config() -> ClockConfig {
    ClockConfig::new()
        .with_tick_interval_ms(10)
        .with_snapshot_interval_ms(40)
        .with_reconcile_interval_ms(60)
        .with_visibility_throttle_ms(50)
        .with_location_timeout_ms(50)
}
