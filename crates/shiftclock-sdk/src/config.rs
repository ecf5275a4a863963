// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Clock engine configuration.

use std::env;

/// Tuning knobs for the session engine.
///
/// All intervals are in milliseconds. The defaults match production
/// behavior; tests typically shrink them.
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Divergence (either direction) between the remote clock-in time and
    /// the local session start beyond which reconciliation overwrites the
    /// local start time (default: 600_000 = 10 minutes).
    pub drift_threshold_ms: u64,
    /// Elapsed-time recompute tick while a session is active
    /// (default: 1_000).
    pub tick_interval_ms: u64,
    /// Minimum wall-clock spacing between local snapshot writes from the
    /// tick loop (default: 10_000). Bounds write volume.
    pub snapshot_interval_ms: u64,
    /// Periodic reconciliation interval while a session is active
    /// (default: 120_000 = 2 minutes).
    pub reconcile_interval_ms: u64,
    /// Minimum spacing between visibility-triggered reconciliations
    /// (default: 60_000).
    pub visibility_throttle_ms: u64,
    /// Snapshots whose session start is older than this are discarded on
    /// restore instead of resurrected (default: 86_400_000 = 24 hours).
    pub restore_max_age_ms: u64,
    /// Upper bound on a single geolocation lookup (default: 10_000).
    pub location_timeout_ms: u64,
    /// Age under which a cached location is reused instead of re-queried
    /// (default: 300_000 = 5 minutes).
    pub location_max_age_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            drift_threshold_ms: 600_000,
            tick_interval_ms: 1_000,
            snapshot_interval_ms: 10_000,
            reconcile_interval_ms: 120_000,
            visibility_throttle_ms: 60_000,
            restore_max_age_ms: 86_400_000,
            location_timeout_ms: 10_000,
            location_max_age_ms: 300_000,
        }
    }
}

fn env_ms(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ClockConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// All variables are optional and fall back to the defaults:
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SHIFTCLOCK_DRIFT_THRESHOLD_MS` | `600000` |
    /// | `SHIFTCLOCK_TICK_INTERVAL_MS` | `1000` |
    /// | `SHIFTCLOCK_SNAPSHOT_INTERVAL_MS` | `10000` |
    /// | `SHIFTCLOCK_RECONCILE_INTERVAL_MS` | `120000` |
    /// | `SHIFTCLOCK_VISIBILITY_THROTTLE_MS` | `60000` |
    /// | `SHIFTCLOCK_RESTORE_MAX_AGE_MS` | `86400000` |
    /// | `SHIFTCLOCK_LOCATION_TIMEOUT_MS` | `10000` |
    /// | `SHIFTCLOCK_LOCATION_MAX_AGE_MS` | `300000` |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            drift_threshold_ms: env_ms(
                "SHIFTCLOCK_DRIFT_THRESHOLD_MS",
                defaults.drift_threshold_ms,
            ),
            tick_interval_ms: env_ms("SHIFTCLOCK_TICK_INTERVAL_MS", defaults.tick_interval_ms),
            snapshot_interval_ms: env_ms(
                "SHIFTCLOCK_SNAPSHOT_INTERVAL_MS",
                defaults.snapshot_interval_ms,
            ),
            reconcile_interval_ms: env_ms(
                "SHIFTCLOCK_RECONCILE_INTERVAL_MS",
                defaults.reconcile_interval_ms,
            ),
            visibility_throttle_ms: env_ms(
                "SHIFTCLOCK_VISIBILITY_THROTTLE_MS",
                defaults.visibility_throttle_ms,
            ),
            restore_max_age_ms: env_ms(
                "SHIFTCLOCK_RESTORE_MAX_AGE_MS",
                defaults.restore_max_age_ms,
            ),
            location_timeout_ms: env_ms(
                "SHIFTCLOCK_LOCATION_TIMEOUT_MS",
                defaults.location_timeout_ms,
            ),
            location_max_age_ms: env_ms(
                "SHIFTCLOCK_LOCATION_MAX_AGE_MS",
                defaults.location_max_age_ms,
            ),
        }
    }

    /// Set the reconciliation drift threshold.
    pub fn with_drift_threshold_ms(mut self, ms: u64) -> Self {
        self.drift_threshold_ms = ms;
        self
    }

    /// Set the elapsed-time tick interval.
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Set the snapshot write throttle.
    pub fn with_snapshot_interval_ms(mut self, ms: u64) -> Self {
        self.snapshot_interval_ms = ms;
        self
    }

    /// Set the periodic reconciliation interval.
    pub fn with_reconcile_interval_ms(mut self, ms: u64) -> Self {
        self.reconcile_interval_ms = ms;
        self
    }

    /// Set the visibility-trigger throttle.
    pub fn with_visibility_throttle_ms(mut self, ms: u64) -> Self {
        self.visibility_throttle_ms = ms;
        self
    }

    /// Set the snapshot staleness cutoff for restore.
    pub fn with_restore_max_age_ms(mut self, ms: u64) -> Self {
        self.restore_max_age_ms = ms;
        self
    }

    /// Set the geolocation lookup timeout.
    pub fn with_location_timeout_ms(mut self, ms: u64) -> Self {
        self.location_timeout_ms = ms;
        self
    }

    /// Set the cached-location freshness window.
    pub fn with_location_max_age_ms(mut self, ms: u64) -> Self {
        self.location_max_age_ms = ms;
        self
    }
}
