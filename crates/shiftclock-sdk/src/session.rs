// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory work session state machine.
//!
//! The machine cycles `OUT -> WORKING -> PAUSED -> WORKING -> ... -> OUT`;
//! there is no terminal state. Transitions are parameterized by an explicit
//! timestamp so the arithmetic is testable without a clock, and every guard
//! rejects without mutating.
//!
//! ```text
//!              start                pause
//!     ┌─────┐ ──────► ┌─────────┐ ──────► ┌────────┐
//!     │ OUT │         │ WORKING │         │ PAUSED │
//!     └─────┘ ◄────── └─────────┘ ◄────── └────────┘
//!               end                resume
//! ```
//!
//! Ending while paused is rejected; the caller resumes first.

use chrono::{DateTime, Duration, Utc};

use crate::error::{ClockError, Result};
use crate::types::{ClockAction, GeoPoint, SessionPhase};

/// State of the current work session.
///
/// This is the single in-memory owner of session truth; the durable local
/// store only ever holds a serialized snapshot of it, and the remote event
/// log wins over both on conflict.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    start_time: Option<DateTime<Utc>>,
    pause_start_time: Option<DateTime<Utc>>,
    total_paused: Duration,
    last_sync: Option<DateTime<Utc>>,
    location: Option<GeoPoint>,
    company_id: Option<String>,
}

impl SessionState {
    /// Empty state: not clocked in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state from persisted parts. Used by snapshot restore and
    /// by tests that need exact timestamps.
    pub fn from_parts(
        start_time: DateTime<Utc>,
        pause_start_time: Option<DateTime<Utc>>,
        total_paused: Duration,
        last_sync: Option<DateTime<Utc>>,
        location: Option<GeoPoint>,
        company_id: Option<String>,
    ) -> Self {
        Self {
            start_time: Some(start_time),
            pause_start_time,
            total_paused,
            last_sync,
            location,
            company_id,
        }
    }

    // ========== Introspection ==========

    /// Current phase of the machine.
    pub fn phase(&self) -> SessionPhase {
        match (self.start_time, self.pause_start_time) {
            (None, _) => SessionPhase::Out,
            (Some(_), None) => SessionPhase::Working,
            (Some(_), Some(_)) => SessionPhase::Paused,
        }
    }

    /// True between an accepted clock-in and the matching clock-out.
    pub fn is_active(&self) -> bool {
        self.start_time.is_some()
    }

    /// True between an accepted break-start and the matching break-end.
    pub fn is_paused(&self) -> bool {
        self.is_active() && self.pause_start_time.is_some()
    }

    /// Moment the active session began, if any.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Moment the current pause began, if paused.
    pub fn pause_start_time(&self) -> Option<DateTime<Utc>> {
        self.pause_start_time
    }

    /// Accumulated pause duration, excluding any in-progress pause.
    pub fn total_paused(&self) -> Duration {
        self.total_paused
    }

    /// Last successful reconciliation against the remote store.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Location captured when the session started, if any.
    pub fn location(&self) -> Option<GeoPoint> {
        self.location
    }

    /// Tenant the session was started under, if any.
    pub fn company_id(&self) -> Option<&str> {
        self.company_id.as_deref()
    }

    /// Net worked time as of `now`: wall time since start minus accumulated
    /// pauses minus the in-progress pause. Zero when not clocked in, and
    /// clamped at zero against clock skew.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        let Some(start) = self.start_time else {
            return Duration::zero();
        };
        let mut elapsed = now - start - self.total_paused;
        if let Some(pause_start) = self.pause_start_time {
            elapsed = elapsed - (now - pause_start);
        }
        elapsed.max(Duration::zero())
    }

    // ========== Transitions ==========

    /// Check whether `action` is permitted in the current phase without
    /// performing it. The façade calls this before issuing the remote write
    /// so rejected intents never reach the event log.
    pub fn ensure_can(&self, action: ClockAction) -> Result<()> {
        let permitted = match action {
            ClockAction::Start => matches!(self.phase(), SessionPhase::Out),
            ClockAction::Pause => matches!(self.phase(), SessionPhase::Working),
            ClockAction::Resume => matches!(self.phase(), SessionPhase::Paused),
            // Ending while paused is rejected; resume first.
            ClockAction::End => matches!(self.phase(), SessionPhase::Working),
        };
        if permitted {
            Ok(())
        } else {
            Err(ClockError::InvalidTransition {
                from: self.phase(),
                action,
            })
        }
    }

    /// `OUT -> WORKING`: open a session at `now`.
    pub fn begin(
        &mut self,
        now: DateTime<Utc>,
        location: Option<GeoPoint>,
        company_id: impl Into<String>,
    ) -> Result<()> {
        self.ensure_can(ClockAction::Start)?;
        self.start_time = Some(now);
        self.pause_start_time = None;
        self.total_paused = Duration::zero();
        self.location = location;
        self.company_id = Some(company_id.into());
        Ok(())
    }

    /// `WORKING -> PAUSED`: begin a break at `now`.
    pub fn pause_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_can(ClockAction::Pause)?;
        self.pause_start_time = Some(now);
        Ok(())
    }

    /// `PAUSED -> WORKING`: end the current break at `now`, folding its
    /// duration into the accumulated total.
    pub fn resume_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_can(ClockAction::Resume)?;
        // Guard above guarantees pause_start_time is set.
        if let Some(pause_start) = self.pause_start_time.take() {
            self.total_paused = self.total_paused + (now - pause_start).max(Duration::zero());
        }
        Ok(())
    }

    /// Reset to `OUT`, dropping all session bookkeeping.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ========== Reconciliation hooks ==========

    /// Overwrite the session start, keeping pause bookkeeping. Used when the
    /// remote clock-in time wins over the local one.
    pub(crate) fn set_start_time(&mut self, start: DateTime<Utc>) {
        self.start_time = Some(start);
    }

    /// Record a successful reconciliation.
    pub(crate) fn set_last_sync(&mut self, at: DateTime<Utc>) {
        self.last_sync = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 8, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> Duration {
        Duration::minutes(m)
    }

    #[test]
    fn test_transition_table_completeness() {
        let all = [
            ClockAction::Start,
            ClockAction::Pause,
            ClockAction::Resume,
            ClockAction::End,
        ];

        // OUT: only start is permitted
        let out = SessionState::new();
        for action in all {
            let permitted = out.ensure_can(action).is_ok();
            assert_eq!(permitted, action == ClockAction::Start, "{action} from out");
        }

        // WORKING: pause and end are permitted
        let mut working = SessionState::new();
        working.begin(t0(), None, "acme").unwrap();
        for action in all {
            let permitted = working.ensure_can(action).is_ok();
            let expected = matches!(action, ClockAction::Pause | ClockAction::End);
            assert_eq!(permitted, expected, "{action} from working");
        }

        // PAUSED: only resume is permitted (ending while paused is rejected)
        let mut paused = working.clone();
        paused.pause_at(t0() + minutes(10)).unwrap();
        for action in all {
            let permitted = paused.ensure_can(action).is_ok();
            assert_eq!(permitted, action == ClockAction::Resume, "{action} from paused");
        }
    }

    #[test]
    fn test_rejected_transition_does_not_mutate() {
        let mut state = SessionState::new();
        let before = state.clone();
        assert!(state.pause_at(t0()).is_err());
        assert!(state.resume_at(t0()).is_err());
        assert_eq!(state, before);

        state.begin(t0(), None, "acme").unwrap();
        let before = state.clone();
        assert!(state.begin(t0() + minutes(1), None, "acme").is_err());
        assert!(state.resume_at(t0() + minutes(1)).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_happy_path_durations() {
        // start at T0, pause at T0+1h, resume at T0+1h15m, end at T0+9h:
        // net worked time is 8h45m.
        let mut state = SessionState::new();
        state.begin(t0(), None, "acme").unwrap();
        assert_eq!(state.phase(), SessionPhase::Working);
        assert_eq!(state.start_time(), Some(t0()));
        assert_eq!(state.total_paused(), Duration::zero());

        state.pause_at(t0() + minutes(60)).unwrap();
        assert_eq!(state.phase(), SessionPhase::Paused);
        assert_eq!(state.pause_start_time(), Some(t0() + minutes(60)));
        assert_eq!(state.total_paused(), Duration::zero());

        state.resume_at(t0() + minutes(75)).unwrap();
        assert_eq!(state.phase(), SessionPhase::Working);
        assert_eq!(state.total_paused(), minutes(15));
        assert_eq!(state.pause_start_time(), None);

        assert_eq!(state.elapsed_at(t0() + minutes(540)), minutes(525));

        state.ensure_can(ClockAction::End).unwrap();
        state.clear();
        assert_eq!(state.phase(), SessionPhase::Out);
        assert_eq!(state, SessionState::new());
    }

    #[test]
    fn test_elapsed_increases_while_working() {
        let mut state = SessionState::new();
        state.begin(t0(), None, "acme").unwrap();
        let mut previous = Duration::zero();
        for s in 1..=5 {
            let elapsed = state.elapsed_at(t0() + Duration::seconds(s));
            assert!(elapsed > previous);
            previous = elapsed;
        }
    }

    #[test]
    fn test_elapsed_frozen_while_paused() {
        let mut state = SessionState::new();
        state.begin(t0(), None, "acme").unwrap();
        state.pause_at(t0() + minutes(30)).unwrap();

        let at_pause = state.elapsed_at(t0() + minutes(30));
        assert_eq!(at_pause, minutes(30));
        // An hour into the pause, elapsed has not moved.
        assert_eq!(state.elapsed_at(t0() + minutes(90)), at_pause);
    }

    #[test]
    fn test_elapsed_excludes_completed_pauses() {
        let mut state = SessionState::new();
        state.begin(t0(), None, "acme").unwrap();
        state.pause_at(t0() + minutes(10)).unwrap();
        state.resume_at(t0() + minutes(20)).unwrap();
        state.pause_at(t0() + minutes(40)).unwrap();
        state.resume_at(t0() + minutes(45)).unwrap();

        // 60 minutes of wall time, 15 paused.
        assert_eq!(state.elapsed_at(t0() + minutes(60)), minutes(45));
    }

    #[test]
    fn test_elapsed_zero_when_out_and_clamped() {
        let state = SessionState::new();
        assert_eq!(state.elapsed_at(t0()), Duration::zero());

        // Clock skew: now earlier than start must not go negative.
        let mut skewed = SessionState::new();
        skewed.begin(t0(), None, "acme").unwrap();
        assert_eq!(skewed.elapsed_at(t0() - minutes(5)), Duration::zero());
    }

    #[test]
    fn test_begin_resets_previous_bookkeeping() {
        let mut state = SessionState::new();
        state.begin(t0(), None, "acme").unwrap();
        state.pause_at(t0() + minutes(5)).unwrap();
        state.resume_at(t0() + minutes(10)).unwrap();
        state.clear();

        let location = GeoPoint { lat: 52.23, lng: 21.01 };
        state.begin(t0() + minutes(60), Some(location), "acme").unwrap();
        assert_eq!(state.total_paused(), Duration::zero());
        assert_eq!(state.start_time(), Some(t0() + minutes(60)));
        assert_eq!(state.location(), Some(location));
        assert_eq!(state.company_id(), Some("acme"));
    }
}
