// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The clock client: session container and action façade.
//!
//! [`ShiftClock`] owns the in-memory [`SessionState`] and is the only thing
//! that mutates it. Every façade operation follows the same shape: resolve
//! identity, check the transition guard, append exactly one event to the
//! remote store, and only then update local state and persist a snapshot.
//! A failed append therefore leaves local state untouched and the error
//! propagates to the caller, which decides whether to retry.
//!
//! One `ShiftClock` is constructed per signed-in UI tree and dropped on
//! teardown; there is no process-global instance.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::backend::{EventStore, IdentityProvider, LocalStore};
use crate::config::ClockConfig;
use crate::error::{ClockError, Result};
use crate::location::{CachedLocationProvider, LocationProvider};
use crate::session::SessionState;
use crate::snapshot;
use crate::types::{ClockAction, EntryType, TimeEvent};

/// Client-side time clock engine.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use shiftclock_sdk::{ClockConfig, ShiftClock};
/// use shiftclock_sdk::backend::http::HttpBackend;
///
/// let backend = Arc::new(HttpBackend::from_env()?);
/// let clock = Arc::new(
///     ShiftClock::new(ClockConfig::from_env(), backend.clone(), backend, local_store)
/// );
/// clock.init().await;                         // restore + load-time sync
/// let sync = clock.clone().spawn_sync_task(); // snapshots + periodic reconcile
///
/// clock.start().await?;               // clock in
/// // ...
/// clock.end().await?;                 // clock out
/// sync.shutdown().await;
/// ```
pub struct ShiftClock {
    pub(crate) config: ClockConfig,
    pub(crate) identity: Arc<dyn IdentityProvider>,
    pub(crate) events: Arc<dyn EventStore>,
    pub(crate) local: Arc<dyn LocalStore>,
    pub(crate) location: Option<CachedLocationProvider>,
    /// Session truth. Held across each whole façade operation so that
    /// overlapping async callers (a button press racing the periodic
    /// reconcile) serialize instead of tearing state.
    pub(crate) session: Mutex<SessionState>,
    /// Re-entrancy guard: collapses overlapping reconciliation triggers.
    pub(crate) reconciling: AtomicBool,
    /// Throttle for visibility-triggered reconciliation.
    pub(crate) last_visibility_sync: StdMutex<Option<Instant>>,
    /// Throttle for tick-driven snapshot writes.
    pub(crate) last_snapshot: StdMutex<Option<Instant>>,
}

impl ShiftClock {
    /// Create a clock over the given collaborators. The clock starts in
    /// `OUT`; call [`init`](Self::init) to restore a persisted session.
    pub fn new(
        config: ClockConfig,
        identity: Arc<dyn IdentityProvider>,
        events: Arc<dyn EventStore>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            config,
            identity,
            events,
            local,
            location: None,
            session: Mutex::new(SessionState::new()),
            reconciling: AtomicBool::new(false),
            last_visibility_sync: StdMutex::new(None),
            last_snapshot: StdMutex::new(None),
        }
    }

    /// Attach a location provider; clock-ins are then annotated with a
    /// best-effort fix (bounded by the configured timeout, cached per the
    /// configured freshness window).
    pub fn with_location_provider(mut self, provider: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(CachedLocationProvider::new(provider, &self.config));
        self
    }

    // ========== Initialization ==========

    /// Restore a persisted session, if one is present and not stale, then
    /// reconcile against the remote store. Returns the resulting state.
    ///
    /// Snapshots older than the configured staleness cutoff are discarded
    /// rather than resurrected. Reconciliation only runs when the snapshot
    /// indicated an in-flight session, and its errors are logged, not
    /// surfaced: the periodic trigger retries within a bounded window.
    #[instrument(skip(self))]
    pub async fn init(&self) -> SessionState {
        let restored = {
            let mut session = self.session.lock().await;
            let max_age = chrono::Duration::milliseconds(self.config.restore_max_age_ms as i64);
            match snapshot::read(self.local.as_ref(), max_age, Utc::now()) {
                Some(state) => {
                    info!(phase = %state.phase(), "session restored from local snapshot");
                    *session = state;
                    true
                }
                None => false,
            }
        };

        if restored {
            self.sync_best_effort().await;
        }

        self.state().await
    }

    // ========== Reads ==========

    /// Clone of the current session state.
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    /// Net worked time as of now.
    pub async fn elapsed(&self) -> chrono::Duration {
        self.session.lock().await.elapsed_at(Utc::now())
    }

    /// Net worked time as of now, formatted `HH:MM:SS`.
    pub async fn elapsed_display(&self) -> String {
        crate::format::format_duration(self.elapsed().await)
    }

    // ========== Action façade ==========

    /// Clock in. Appends a `clock_in` event (with a best-effort location
    /// fix when a provider is attached) and moves the session to WORKING.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let (user_id, company_id) = self.require_identity().await?;
        let mut session = self.session.lock().await;
        session.ensure_can(ClockAction::Start)?;

        let location = match &self.location {
            Some(provider) => provider.capture().await,
            None => None,
        };

        let now = Utc::now();
        let event = TimeEvent::new(&user_id, &company_id, EntryType::ClockIn, now)
            .with_location(location);
        self.events.append_event(&event).await?;

        session.begin(now, location, company_id)?;
        self.persist(&session, now);
        info!(user_id = %user_id, "clocked in");
        Ok(())
    }

    /// Begin a break. Appends a `break_start` event and moves the session
    /// to PAUSED.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let (user_id, company_id) = self.require_identity().await?;
        let mut session = self.session.lock().await;
        session.ensure_can(ClockAction::Pause)?;

        let now = Utc::now();
        let event = TimeEvent::new(&user_id, &company_id, EntryType::BreakStart, now);
        self.events.append_event(&event).await?;

        session.pause_at(now)?;
        self.persist(&session, now);
        info!(user_id = %user_id, "break started");
        Ok(())
    }

    /// End the current break. Appends a `break_end` event, folds the pause
    /// into the accumulated total, and moves the session back to WORKING.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> Result<()> {
        let (user_id, company_id) = self.require_identity().await?;
        let mut session = self.session.lock().await;
        session.ensure_can(ClockAction::Resume)?;

        let now = Utc::now();
        let event = TimeEvent::new(&user_id, &company_id, EntryType::BreakEnd, now);
        self.events.append_event(&event).await?;

        session.resume_at(now)?;
        self.persist(&session, now);
        info!(user_id = %user_id, "break ended");
        Ok(())
    }

    /// Clock out. Validates against the remote store that an open session
    /// exists (a defensive re-fetch, not a trust of local state), appends a
    /// `clock_out` event, and clears both the in-memory state and the local
    /// snapshot. Ending while paused is rejected; resume first.
    #[instrument(skip(self))]
    pub async fn end(&self) -> Result<()> {
        let (user_id, company_id) = self.require_identity().await?;
        let mut session = self.session.lock().await;
        session.ensure_can(ClockAction::End)?;

        if self
            .open_remote_session(&user_id, &company_id)
            .await?
            .is_none()
        {
            return Err(ClockError::NoActiveSession);
        }

        let now = Utc::now();
        let event = TimeEvent::new(&user_id, &company_id, EntryType::ClockOut, now);
        self.events.append_event(&event).await?;

        session.clear();
        snapshot::clear(self.local.as_ref());
        info!(user_id = %user_id, "clocked out");
        Ok(())
    }

    // ========== Internals ==========

    /// Resolve the signed-in user and their active tenant. Identity lookup
    /// failures are treated as unauthenticated (fail closed).
    pub(crate) async fn require_identity(&self) -> Result<(String, String)> {
        let identity = match self.identity.current_user().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "identity lookup failed, treating as unauthenticated");
                None
            }
        };
        let user = identity.ok_or(ClockError::NotAuthenticated)?;
        let company_id = user.company_id.ok_or(ClockError::NoCompanyContext)?;
        Ok((user.id, company_id))
    }

    /// The open remote session for the user, if any: the most recent
    /// `clock_in` not yet matched by a `clock_out` at or after it.
    pub(crate) async fn open_remote_session(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> Result<Option<TimeEvent>> {
        let Some(clock_in) = self
            .events
            .latest_event_of_type(user_id, company_id, EntryType::ClockIn, None)
            .await?
        else {
            return Ok(None);
        };

        let clock_out = self
            .events
            .latest_event_of_type(user_id, company_id, EntryType::ClockOut, None)
            .await?;

        match clock_out {
            Some(out) if out.entry_time >= clock_in.entry_time => Ok(None),
            _ => Ok(Some(clock_in)),
        }
    }

    /// Write a snapshot and reset the tick-path throttle.
    pub(crate) fn persist(&self, session: &SessionState, now: chrono::DateTime<Utc>) {
        snapshot::write(self.local.as_ref(), session, now);
        *self.last_snapshot.lock().unwrap() = Some(Instant::now());
    }
}
