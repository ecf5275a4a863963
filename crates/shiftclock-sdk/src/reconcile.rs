// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reconciliation against the remote event log.
//!
//! Local session state can drift from the remote store: a clock-in written
//! while offline may never have landed, or the session may have been closed
//! from another device. Reconciliation detects and resolves divergence,
//! always preferring the remote log as ground truth except when healing a
//! remote gap from trusted local state.
//!
//! One reconcile function is fed by several independent triggers:
//!
//! | Trigger | Entry point | Throttle |
//! |---------|-------------|----------|
//! | initial load (snapshot active) | [`ShiftClock::init`] | once |
//! | tab became visible | [`ShiftClock::on_visibility_restored`] | 60 s |
//! | connectivity restored | [`ShiftClock::on_network_restored`] | none |
//! | periodic while active | [`ShiftClock::spawn_sync_task`] | 2 min |
//! | manual | [`ShiftClock::force_sync`] | none |
//!
//! Triggers overlap freely; an in-progress flag collapses them to one run.
//! There is no retry/backoff on failure: the periodic trigger re-runs
//! within a bounded window, which is the retry policy.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::client::ShiftClock;
use crate::error::Result;
use crate::snapshot;
use crate::types::{EntryType, TimeEvent};

impl ShiftClock {
    /// Manually trigger a reconciliation and surface its result.
    ///
    /// Background triggers use the same logic but log-and-swallow instead.
    pub async fn force_sync(&self) -> Result<()> {
        self.reconcile().await
    }

    /// Notify the engine that the UI became visible again (tab refocus,
    /// app foregrounded). Reconciles at most once per configured throttle
    /// window.
    pub async fn on_visibility_restored(&self) {
        let throttled = {
            let mut last = self.last_visibility_sync.lock().unwrap();
            match *last {
                Some(at)
                    if at.elapsed()
                        < Duration::from_millis(self.config.visibility_throttle_ms) =>
                {
                    true
                }
                _ => {
                    *last = Some(Instant::now());
                    false
                }
            }
        };
        if throttled {
            debug!("visibility sync throttled");
            return;
        }
        self.sync_best_effort().await;
    }

    /// Notify the engine that network connectivity was restored.
    pub async fn on_network_restored(&self) {
        self.sync_best_effort().await;
    }

    /// Run a reconciliation and log instead of propagating. Background
    /// triggers have no caller to hand an error to.
    pub(crate) async fn sync_best_effort(&self) {
        if let Err(e) = self.reconcile().await {
            warn!(error = %e, "reconciliation failed");
        }
    }

    /// Compare local session state against the remote store and resolve
    /// divergence. At most one reconciliation runs at a time; overlapping
    /// triggers return immediately.
    #[instrument(skip(self))]
    pub(crate) async fn reconcile(&self) -> Result<()> {
        if self.reconciling.swap(true, Ordering::SeqCst) {
            debug!("reconciliation already in progress");
            return Ok(());
        }
        let result = self.reconcile_inner().await;
        self.reconciling.store(false, Ordering::SeqCst);
        result
    }

    async fn reconcile_inner(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        // Nothing to reconcile without a locally active session; this also
        // keeps reconciliation from writing remotely for users who were
        // never clocked in.
        let Some(local_start) = session.start_time() else {
            return Ok(());
        };

        // Abort silently when identity cannot be resolved; the next
        // trigger retries.
        let Ok((user_id, company_id)) = self.require_identity().await else {
            debug!("skipping reconciliation without identity");
            return Ok(());
        };

        let latest_in = self
            .events
            .latest_event_of_type(&user_id, &company_id, EntryType::ClockIn, None)
            .await?;
        let now = Utc::now();

        let Some(clock_in) = latest_in else {
            // Local-ahead: the remote store never saw this session (the
            // original write was lost, e.g. offline). Heal by re-inserting
            // the clock-in at the locally remembered start.
            let event = TimeEvent::new(&user_id, &company_id, EntryType::ClockIn, local_start)
                .with_location(session.location());
            self.events.append_event(&event).await?;
            session.set_last_sync(now);
            self.persist(&session, now);
            info!(start = %local_start, "healed remote store from local session");
            return Ok(());
        };

        let clock_out = self
            .events
            .latest_event_of_type(&user_id, &company_id, EntryType::ClockOut, None)
            .await?;

        if clock_out.is_some_and(|out| out.entry_time >= clock_in.entry_time) {
            // Remote-ahead: the session was closed elsewhere. Remote wins.
            warn!("remote store shows session closed, clearing local state");
            session.clear();
            snapshot::clear(self.local.as_ref());
            return Ok(());
        }

        // Session is genuinely open remotely. Adopt the remote start time
        // when the local one has drifted past the threshold.
        let drift = (clock_in.entry_time - local_start).abs();
        if drift > chrono::Duration::milliseconds(self.config.drift_threshold_ms as i64) {
            warn!(
                local = %local_start,
                remote = %clock_in.entry_time,
                "local start drifted from remote clock-in, adopting remote"
            );
            session.set_start_time(clock_in.entry_time);
        }
        session.set_last_sync(now);
        self.persist(&session, now);
        Ok(())
    }

    // ========== Background task ==========

    /// Spawn the background sync task: a one-second tick that recomputes
    /// elapsed time consumers observe, throttles snapshot writes to the
    /// configured interval, and runs the periodic reconciliation while a
    /// session is active. Returns a handle for graceful shutdown.
    ///
    /// Takes an owned `Arc`; callers keep their own clone:
    /// `clock.clone().spawn_sync_task()`.
    pub fn spawn_sync_task(self: Arc<Self>) -> SyncHandle {
        let clock = self;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tick = Duration::from_millis(clock.config.tick_interval_ms);
        let reconcile_every = Duration::from_millis(clock.config.reconcile_interval_ms);

        let handle = tokio::spawn(async move {
            debug!("sync task started");
            let mut last_reconcile = Instant::now();
            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => {
                        debug!("sync task cancelled");
                        break;
                    }

                    _ = tokio::time::sleep(tick) => {
                        clock.snapshot_tick().await;
                        if last_reconcile.elapsed() >= reconcile_every {
                            last_reconcile = Instant::now();
                            clock.sync_best_effort().await;
                        }
                    }
                }
            }
        });

        SyncHandle { cancel, handle }
    }

    /// Tick-path snapshot write, throttled so per-second ticks produce at
    /// most one write per configured snapshot interval.
    pub(crate) async fn snapshot_tick(&self) {
        let session = self.session.lock().await;
        if !session.is_active() {
            return;
        }
        let due = {
            let mut last = self.last_snapshot.lock().unwrap();
            match *last {
                Some(at)
                    if at.elapsed() < Duration::from_millis(self.config.snapshot_interval_ms) =>
                {
                    false
                }
                _ => {
                    *last = Some(Instant::now());
                    true
                }
            }
        };
        if due {
            snapshot::write(self.local.as_ref(), &session, Utc::now());
        }
    }
}

/// Handle to the background sync task.
pub struct SyncHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SyncHandle {
    /// Request cancellation and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }

    /// Request cancellation without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}
