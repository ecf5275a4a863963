// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Backend trait seams for the external collaborators.
//!
//! The engine talks to three collaborators, each behind its own trait so
//! tests and embedded deployments can swap implementations:
//! - [`IdentityProvider`]: who is signed in, and under which tenant
//! - [`EventStore`]: the authoritative append-only remote time event log
//! - [`LocalStore`]: synchronous durable key-value storage for snapshots
//!
//! Backends:
//! - `memory`: in-process implementation for tests and embedded use
//! - `http`: REST implementation against the hosted API (feature `http`)

pub mod memory;

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{EntryType, TimeEvent, UserIdentity};

/// Resolves the currently authenticated user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Return the signed-in identity, or `None` when unauthenticated.
    ///
    /// Callers treat errors as unauthenticated (fail closed); an `Err` is
    /// only distinguished for logging.
    async fn current_user(&self) -> Result<Option<UserIdentity>>;
}

/// Authoritative append-only log of time events, one row per event.
///
/// The store guarantees nothing beyond per-row timestamps: a read is not
/// required to reflect a write that was issued but not yet acknowledged,
/// and ordering invariants are the consumer's problem.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event. Returns the stored row on success.
    async fn append_event(&self, event: &TimeEvent) -> Result<TimeEvent>;

    /// Most recent event of `entry_type` for the user/tenant, optionally
    /// restricted to events strictly before `before`.
    async fn latest_event_of_type(
        &self,
        user_id: &str,
        company_id: &str,
        entry_type: EntryType,
        before: Option<DateTime<Utc>>,
    ) -> Result<Option<TimeEvent>>;
}

/// Durable local key-value storage surviving restarts and offline periods.
///
/// Synchronous by contract (browser-storage semantics). Writes are
/// best-effort: implementations log and swallow their own I/O failures,
/// since the remote store is the system of record and the next snapshot
/// overwrites whatever was lost.
pub trait LocalStore: Send + Sync {
    /// Read a value, `None` when absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str);

    /// Delete a value. Deleting an absent key is a no-op.
    fn remove(&self, key: &str);
}
