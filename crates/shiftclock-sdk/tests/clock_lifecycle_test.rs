// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! E2E tests for the action façade lifecycle.

mod common;

use std::sync::Arc;

use common::*;
use shiftclock_sdk::backend::LocalStore;
use shiftclock_sdk::{
    ClockError, EntryType, GeoPoint, SessionPhase, ShiftClock, StaticLocationProvider,
};
use shiftclock_sdk::snapshot::keys;

#[tokio::test]
async fn test_full_session_lifecycle() {
    let ctx = TestContext::new();

    // 1. Clock in
    ctx.clock.start().await.expect("start should succeed");
    let state = ctx.clock.state().await;
    assert_eq!(state.phase(), SessionPhase::Working);
    assert!(state.start_time().is_some());

    // 2. Snapshot persisted for restart recovery
    assert_eq!(ctx.local.get(keys::ACTIVE_SESSION).as_deref(), Some("true"));
    assert_eq!(ctx.local.get(keys::COMPANY_ID).as_deref(), Some(COMPANY));

    // 3. Take a break and come back
    ctx.clock.pause().await.expect("pause should succeed");
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Paused);
    assert_eq!(ctx.local.get(keys::IS_PAUSED).as_deref(), Some("true"));

    ctx.clock.resume().await.expect("resume should succeed");
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Working);

    // 4. Clock out
    ctx.clock.end().await.expect("end should succeed");
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Out);

    // 5. Remote log holds the full, ordered session
    assert_eq!(
        ctx.remote_entry_types(),
        vec![
            EntryType::ClockIn,
            EntryType::BreakStart,
            EntryType::BreakEnd,
            EntryType::ClockOut,
        ]
    );

    // 6. Local snapshot wiped
    assert!(ctx.local.is_empty());
}

#[tokio::test]
async fn test_invalid_transitions_are_rejected_without_side_effects() {
    let ctx = TestContext::new();

    // Cannot pause/resume/end while out
    assert!(matches!(
        ctx.clock.pause().await,
        Err(ClockError::InvalidTransition { .. })
    ));
    assert!(matches!(
        ctx.clock.resume().await,
        Err(ClockError::InvalidTransition { .. })
    ));
    assert!(matches!(
        ctx.clock.end().await,
        Err(ClockError::InvalidTransition { .. })
    ));

    // No remote events and no local snapshot were produced
    assert!(ctx.backend.events().is_empty());
    assert!(ctx.local.is_empty());

    ctx.clock.start().await.unwrap();

    // Cannot double-start or resume while working
    assert!(matches!(
        ctx.clock.start().await,
        Err(ClockError::InvalidTransition { .. })
    ));
    assert!(matches!(
        ctx.clock.resume().await,
        Err(ClockError::InvalidTransition { .. })
    ));

    // Exactly the one clock-in reached the remote log
    assert_eq!(ctx.remote_entry_types(), vec![EntryType::ClockIn]);
}

#[tokio::test]
async fn test_end_while_paused_is_rejected() {
    let ctx = TestContext::new();
    ctx.clock.start().await.unwrap();
    ctx.clock.pause().await.unwrap();

    let err = ctx.clock.end().await.unwrap_err();
    assert!(matches!(
        err,
        ClockError::InvalidTransition {
            from: SessionPhase::Paused,
            ..
        }
    ));

    // Still paused; resume-then-end works
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Paused);
    ctx.clock.resume().await.unwrap();
    ctx.clock.end().await.unwrap();
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Out);
}

#[tokio::test]
async fn test_failed_append_leaves_state_untouched() {
    let ctx = TestContext::new();
    ctx.clock.start().await.unwrap();
    let before = ctx.clock.state().await;
    let snapshot_before = ctx.local.get(keys::START_TIME);

    // Network goes away mid-session; the pause must fail loudly and
    // change nothing.
    ctx.backend.set_fail_appends(true);
    let err = ctx.clock.pause().await.unwrap_err();
    assert!(matches!(err, ClockError::RemoteWrite(_)));

    assert_eq!(ctx.clock.state().await, before);
    assert_eq!(ctx.remote_entry_types(), vec![EntryType::ClockIn]);
    assert_eq!(ctx.local.get(keys::START_TIME), snapshot_before);
    assert_eq!(ctx.local.get(keys::IS_PAUSED).as_deref(), Some("false"));

    // Connectivity returns; the retry succeeds
    ctx.backend.set_fail_appends(false);
    ctx.clock.pause().await.unwrap();
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Paused);
}

#[tokio::test]
async fn test_failed_start_appends_nothing_locally_or_remotely() {
    let ctx = TestContext::new();
    ctx.backend.set_fail_appends(true);

    assert!(matches!(
        ctx.clock.start().await,
        Err(ClockError::RemoteWrite(_))
    ));
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Out);
    assert!(ctx.local.is_empty());
}

#[tokio::test]
async fn test_end_requires_open_remote_session() {
    let ctx = TestContext::new();
    ctx.clock.start().await.unwrap();

    // The remote store loses the session (e.g. the row was deleted by an
    // admin); end() re-fetches and refuses rather than appending a
    // dangling clock-out.
    ctx.backend.clear_events();
    let err = ctx.clock.end().await.unwrap_err();
    assert!(matches!(err, ClockError::NoActiveSession));

    // Local state is left for reconciliation to sort out
    assert_eq!(ctx.clock.state().await.phase(), SessionPhase::Working);
}

#[tokio::test]
async fn test_operations_fail_closed_without_identity() {
    let ctx = TestContext::signed_out();

    for result in [
        ctx.clock.start().await,
        ctx.clock.pause().await,
        ctx.clock.resume().await,
        ctx.clock.end().await,
    ] {
        assert!(matches!(result, Err(ClockError::NotAuthenticated)));
    }
    assert!(ctx.backend.events().is_empty());
}

#[tokio::test]
async fn test_start_annotates_location_when_available() {
    let site = GeoPoint { lat: 52.2297, lng: 21.0122 };
    let ctx = TestContext::new();
    let clock = ShiftClock::new(
        ctx.config.clone(),
        ctx.backend.clone(),
        ctx.backend.clone(),
        ctx.local.clone(),
    )
    .with_location_provider(Arc::new(StaticLocationProvider::new(site)));

    clock.start().await.unwrap();

    let events = ctx.backend.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].location, Some(site));
    assert_eq!(clock.state().await.location(), Some(site));
}

#[tokio::test]
async fn test_elapsed_display_formats() {
    let ctx = TestContext::new();
    assert_eq!(ctx.clock.elapsed_display().await, "00:00:00");
    ctx.clock.start().await.unwrap();
    // Freshly started: still in the first minute
    let display = ctx.clock.elapsed_display().await;
    assert!(display.starts_with("00:00:"), "unexpected display {display}");
}
