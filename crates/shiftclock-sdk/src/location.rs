// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Best-effort geolocation capture.
//!
//! Clock-in events are annotated with a location when one can be obtained
//! quickly; failure to obtain one never blocks the clock-in. Lookups are
//! bounded by a timeout and a recent fix is reused instead of re-queried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ClockConfig;
use crate::error::{ClockError, Result};
use crate::types::GeoPoint;

/// Source of device location fixes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Obtain a current fix. May take arbitrarily long or fail; callers
    /// bound it with a timeout.
    async fn current_location(&self) -> Result<GeoPoint>;
}

/// Provider returning a constant fix. Useful for tests and kiosks with a
/// known site position.
#[derive(Debug, Clone, Copy)]
pub struct StaticLocationProvider {
    point: GeoPoint,
}

impl StaticLocationProvider {
    /// Provider always returning `point`.
    pub fn new(point: GeoPoint) -> Self {
        Self { point }
    }
}

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn current_location(&self) -> Result<GeoPoint> {
        Ok(self.point)
    }
}

/// Decorator adding the timeout and freshness-cache policy on top of any
/// [`LocationProvider`].
pub struct CachedLocationProvider {
    inner: Arc<dyn LocationProvider>,
    timeout: Duration,
    max_age: chrono::Duration,
    cached: Mutex<Option<(GeoPoint, DateTime<Utc>)>>,
}

impl CachedLocationProvider {
    /// Wrap `inner` with the timeout/staleness settings from `config`.
    pub fn new(inner: Arc<dyn LocationProvider>, config: &ClockConfig) -> Self {
        Self {
            inner,
            timeout: Duration::from_millis(config.location_timeout_ms),
            max_age: chrono::Duration::milliseconds(config.location_max_age_ms as i64),
            cached: Mutex::new(None),
        }
    }

    /// Best-effort capture: a fresh cached fix if available, otherwise a
    /// bounded lookup. Returns `None` on timeout or provider failure.
    pub async fn capture(&self) -> Option<GeoPoint> {
        let now = Utc::now();

        let mut cached = self.cached.lock().await;
        if let Some((point, at)) = *cached {
            if now - at <= self.max_age {
                debug!("reusing cached location fix");
                return Some(point);
            }
        }

        match tokio::time::timeout(self.timeout, self.inner.current_location()).await {
            Ok(Ok(point)) => {
                *cached = Some((point, now));
                Some(point)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "location lookup failed");
                None
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "location lookup timed out");
                None
            }
        }
    }
}

/// Provider double whose lookups never resolve. Exercises the timeout path.
#[derive(Debug, Default)]
pub struct PendingLocationProvider;

#[async_trait]
impl LocationProvider for PendingLocationProvider {
    async fn current_location(&self) -> Result<GeoPoint> {
        std::future::pending::<()>().await;
        Err(ClockError::Backend("unreachable".to_string()))
    }
}
