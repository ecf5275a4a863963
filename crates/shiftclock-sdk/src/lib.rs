// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shiftclock SDK - client-side time clock engine.
//!
//! This crate owns the work-session state for the shiftclock client apps:
//! whether the employee is clocked in, paused, or out; how much net time
//! they have worked; and how that state survives restarts, offline periods,
//! and edits made from other devices. The remote event log is the system of
//! record; this engine keeps a local mirror honest against it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          UI layer                             │
//! │        (buttons, timers, visibility/online listeners)         │
//! └───────────────────────────────────────────────────────────────┘
//!        │ start/pause/resume/end        │ state()/elapsed()
//!        ▼                               ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     ShiftClock (this crate)                   │
//! │   action façade ──► SessionState ◄── reconciliation engine    │
//! └───────────────────────────────────────────────────────────────┘
//!        │ append/query events     │ snapshot       ▲ identity
//!        ▼                         ▼                │
//! ┌────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  EventStore    │   │   LocalStore     │   │ IdentityProvider │
//! │ (remote log)   │   │ (durable local)  │   │   (auth/tenant)  │
//! └────────────────┘   └──────────────────┘   └──────────────────┘
//! ```
//!
//! # Session state machine
//!
//! ```text
//!              start                pause
//!     ┌─────┐ ──────► ┌─────────┐ ──────► ┌────────┐
//!     │ OUT │         │ WORKING │         │ PAUSED │
//!     └─────┘ ◄────── └─────────┘ ◄────── └────────┘
//!               end                resume
//! ```
//!
//! Each façade operation appends exactly one event to the remote log and
//! only mutates local state after the append is acknowledged, so a failed
//! network write leaves the button state truthful and the error surfaces
//! to the caller for a retry affordance. Ending while paused is rejected;
//! the UI resumes first.
//!
//! # Divergence handling
//!
//! Reconciliation runs on load, on visibility/connectivity triggers, on a
//! periodic timer while a session is active, and on demand:
//!
//! | Divergence | Resolution |
//! |------------|------------|
//! | local session, no remote clock-in | re-insert the clock-in at the local start (heal) |
//! | remote clock-out at/after the clock-in | clear local state, remote wins |
//! | start times drifted past threshold | adopt the remote start time |
//!
//! Snapshots older than 24 hours are presumed abandoned and discarded on
//! restore instead of resurrected.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use shiftclock_sdk::{ClockConfig, ShiftClock};
//! use shiftclock_sdk::backend::http::HttpBackend;
//!
//! # async fn run(local_store: Arc<dyn shiftclock_sdk::backend::LocalStore>) -> shiftclock_sdk::Result<()> {
//! let backend = Arc::new(HttpBackend::from_env()?);
//! let clock = Arc::new(ShiftClock::new(
//!     ClockConfig::from_env(),
//!     backend.clone(),
//!     backend,
//!     local_store,
//! ));
//!
//! clock.init().await;                          // restore + load-time sync
//! let sync = clock.clone().spawn_sync_task();  // snapshots + periodic reconcile
//!
//! clock.start().await?;
//! println!("{}", clock.elapsed_display().await);
//! clock.end().await?;
//!
//! sync.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! [`ClockConfig`] carries the tuning knobs (drift threshold, snapshot and
//! reconcile intervals, staleness cutoff, location bounds); all have
//! production defaults and `SHIFTCLOCK_*` environment overrides.

pub mod backend;
mod client;
mod config;
mod error;
mod format;
mod location;
mod reconcile;
mod session;
pub mod snapshot;
mod types;

// Main types
pub use client::ShiftClock;
pub use config::ClockConfig;
pub use error::{ClockError, Result};
pub use format::{format_duration, format_time};
pub use location::{
    CachedLocationProvider, LocationProvider, PendingLocationProvider, StaticLocationProvider,
};
pub use reconcile::SyncHandle;
pub use session::SessionState;
pub use types::{ClockAction, EntryType, GeoPoint, SessionPhase, TimeEvent, UserIdentity};
