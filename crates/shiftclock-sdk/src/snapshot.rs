// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Serialized session snapshots in the durable local store.
//!
//! The local store is a flat namespace of fixed string keys, one per state
//! field. It is a cache of the in-memory state, never a second source of
//! truth: on conflict the remote event log wins over the snapshot, and the
//! snapshot wins over an uninitialized in-memory state.
//!
//! A snapshot is only present while a session is active; ending a session
//! removes every key.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::backend::LocalStore;
use crate::session::SessionState;
use crate::types::GeoPoint;

/// Fixed key namespace of the durable local store.
pub mod keys {
    /// `"true"` while a session is in flight.
    pub const ACTIVE_SESSION: &str = "active_session";
    /// Session start, RFC 3339.
    pub const START_TIME: &str = "start_time";
    /// Elapsed millis at snapshot time. Informational only; restore always
    /// recomputes from `start_time`.
    pub const ELAPSED_TIME: &str = "elapsed_time";
    /// `"true"` while paused.
    pub const IS_PAUSED: &str = "is_paused";
    /// Start of the in-progress pause, RFC 3339. Present only while paused.
    pub const PAUSE_START_TIME: &str = "pause_start_time";
    /// Accumulated completed-pause millis.
    pub const TOTAL_PAUSED_TIME: &str = "total_paused_time";
    /// Last successful reconciliation, RFC 3339.
    pub const LAST_SYNC: &str = "last_sync";
    /// JSON-encoded location captured at session start.
    pub const LOCATION: &str = "location";
    /// Tenant the session was started under.
    pub const COMPANY_ID: &str = "company_id";
}

const ALL_KEYS: [&str; 9] = [
    keys::ACTIVE_SESSION,
    keys::START_TIME,
    keys::ELAPSED_TIME,
    keys::IS_PAUSED,
    keys::PAUSE_START_TIME,
    keys::TOTAL_PAUSED_TIME,
    keys::LAST_SYNC,
    keys::LOCATION,
    keys::COMPANY_ID,
];

/// Persist the state of an active session. No-op when the session is `OUT`
/// (an ended session is represented by the absence of a snapshot, via
/// [`clear`]).
pub(crate) fn write(store: &dyn LocalStore, state: &SessionState, now: DateTime<Utc>) {
    let Some(start) = state.start_time() else {
        return;
    };

    store.set(keys::ACTIVE_SESSION, "true");
    store.set(keys::START_TIME, &start.to_rfc3339());
    store.set(
        keys::ELAPSED_TIME,
        &state.elapsed_at(now).num_milliseconds().to_string(),
    );
    store.set(
        keys::TOTAL_PAUSED_TIME,
        &state.total_paused().num_milliseconds().to_string(),
    );

    if let Some(pause_start) = state.pause_start_time() {
        store.set(keys::IS_PAUSED, "true");
        store.set(keys::PAUSE_START_TIME, &pause_start.to_rfc3339());
    } else {
        store.set(keys::IS_PAUSED, "false");
        store.remove(keys::PAUSE_START_TIME);
    }

    match state.last_sync() {
        Some(at) => store.set(keys::LAST_SYNC, &at.to_rfc3339()),
        None => store.remove(keys::LAST_SYNC),
    }

    match state.location().and_then(|l| serde_json::to_string(&l).ok()) {
        Some(json) => store.set(keys::LOCATION, &json),
        None => store.remove(keys::LOCATION),
    }

    match state.company_id() {
        Some(company) => store.set(keys::COMPANY_ID, company),
        None => store.remove(keys::COMPANY_ID),
    }

    debug!("session snapshot written");
}

/// Remove every snapshot key.
pub(crate) fn clear(store: &dyn LocalStore) {
    for key in ALL_KEYS {
        store.remove(key);
    }
}

/// Restore a session from the local store, if one is present, parseable,
/// and not stale.
///
/// A snapshot whose start time is more than `max_age` in the past is an
/// abandoned session: it is cleared and not restored. Corrupt snapshots
/// are treated the same way rather than half-restored.
pub(crate) fn read(
    store: &dyn LocalStore,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Option<SessionState> {
    if store.get(keys::ACTIVE_SESSION).as_deref() != Some("true") {
        return None;
    }

    let Some(start) = store.get(keys::START_TIME).and_then(|s| parse_rfc3339(&s)) else {
        warn!("snapshot has no parseable start time, discarding");
        clear(store);
        return None;
    };

    if now - start > max_age {
        debug!(start = %start, "snapshot older than staleness cutoff, discarding");
        clear(store);
        return None;
    }

    let paused = store.get(keys::IS_PAUSED).as_deref() == Some("true");
    let pause_start = if paused {
        match store
            .get(keys::PAUSE_START_TIME)
            .and_then(|s| parse_rfc3339(&s))
        {
            Some(at) => Some(at),
            None => {
                warn!("paused snapshot has no parseable pause start, discarding");
                clear(store);
                return None;
            }
        }
    } else {
        None
    };

    let total_paused = store
        .get(keys::TOTAL_PAUSED_TIME)
        .and_then(|s| s.parse::<i64>().ok())
        .map(Duration::milliseconds)
        .unwrap_or_else(Duration::zero);

    let last_sync = store.get(keys::LAST_SYNC).and_then(|s| parse_rfc3339(&s));
    let location: Option<GeoPoint> = store
        .get(keys::LOCATION)
        .and_then(|s| serde_json::from_str(&s).ok());
    let company_id = store.get(keys::COMPANY_ID);

    Some(SessionState::from_parts(
        start,
        pause_start,
        total_paused,
        last_sync,
        location,
        company_id,
    ))
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
