// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Core types shared across the SDK.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of time entry recorded in the remote event log.
///
/// A well-formed session is a `clock_in`, zero or more
/// `break_start`/`break_end` pairs, then a `clock_out`. The store itself does
/// not enforce this ordering; consumers must tolerate violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Session opened.
    ClockIn,
    /// Session closed.
    ClockOut,
    /// Pause started within an open session.
    BreakStart,
    /// Pause ended within an open session.
    BreakEnd,
}

impl EntryType {
    /// Wire/storage string for this entry type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::ClockIn => "clock_in",
            EntryType::ClockOut => "clock_out",
            EntryType::BreakStart => "break_start",
            EntryType::BreakEnd => "break_end",
        }
    }

    /// Parse a wire/storage string. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clock_in" => Some(EntryType::ClockIn),
            "clock_out" => Some(EntryType::ClockOut),
            "break_start" => Some(EntryType::BreakStart),
            "break_end" => Some(EntryType::BreakEnd),
            _ => None,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latitude/longitude pair captured at event time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

/// One row of the remote append-only time event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEvent {
    /// Subject user.
    pub user_id: String,
    /// Tenant the event belongs to.
    pub company_id: String,
    /// What happened.
    pub entry_type: EntryType,
    /// Authoritative moment of the event (UTC).
    pub entry_time: DateTime<Utc>,
    /// Best-effort location captured at event time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<GeoPoint>,
}

impl TimeEvent {
    /// Build an event stamped with the given time.
    pub fn new(
        user_id: impl Into<String>,
        company_id: impl Into<String>,
        entry_type: EntryType,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            company_id: company_id.into(),
            entry_type,
            entry_time,
            location: None,
        }
    }

    /// Attach a location to the event.
    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        self.location = location;
        self
    }
}

/// Authenticated identity as resolved by the identity provider.
///
/// `company_id` is `None` when the user is authenticated but has no active
/// tenant membership; façade operations fail with
/// [`ClockError::NoCompanyContext`](crate::ClockError::NoCompanyContext)
/// in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Unique user identifier.
    pub id: String,
    /// Active tenant membership, if any.
    pub company_id: Option<String>,
}

impl UserIdentity {
    /// Identity with an active company membership.
    pub fn new(id: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            company_id: Some(company_id.into()),
        }
    }

    /// Identity without a resolved tenant.
    pub fn without_company(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            company_id: None,
        }
    }
}

/// Phase of the local work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not clocked in.
    Out,
    /// Clocked in, not paused.
    Working,
    /// Clocked in, paused.
    Paused,
}

impl SessionPhase {
    /// Lowercase label, used in errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Out => "out",
            SessionPhase::Working => "working",
            SessionPhase::Paused => "paused",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Façade operation names, used in transition guards and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAction {
    /// `start()` - open a session.
    Start,
    /// `pause()` - begin a break.
    Pause,
    /// `resume()` - end a break.
    Resume,
    /// `end()` - close the session.
    End,
}

impl ClockAction {
    /// Lowercase label, used in errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockAction::Start => "start",
            ClockAction::Pause => "pause",
            ClockAction::Resume => "resume",
            ClockAction::End => "end",
        }
    }
}

impl fmt::Display for ClockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
