// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP backend against the hosted REST API.
//!
//! Talks to a PostgREST-compatible API (the hosted platform exposes the
//! `time_events` table this way) plus its `/auth/v1/user` identity
//! endpoint. Requests carry the project api key and a bearer token; rows
//! are plain JSON and row-level security scopes them to the caller.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{EventStore, IdentityProvider};
use crate::error::{ClockError, Result};
use crate::types::{EntryType, TimeEvent, UserIdentity};

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// API base URL, e.g. `https://project.example.co`.
    pub base_url: String,
    /// Project api key, sent as the `apikey` header and used as the bearer
    /// token until a user token is set.
    pub api_key: String,
    /// Signed-in user's access token (JWT), if already available.
    pub access_token: Option<String>,
    /// Events table name (default: `time_events`).
    pub table: String,
}

impl HttpBackendConfig {
    /// Settings for the given project.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            table: "time_events".to_string(),
        }
    }

    /// Load settings from environment variables.
    ///
    /// `SHIFTCLOCK_API_URL` and `SHIFTCLOCK_API_KEY` are required;
    /// `SHIFTCLOCK_ACCESS_TOKEN` and `SHIFTCLOCK_EVENTS_TABLE` are
    /// optional.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SHIFTCLOCK_API_URL")
            .map_err(|_| ClockError::Config("SHIFTCLOCK_API_URL is required".to_string()))?;
        let api_key = std::env::var("SHIFTCLOCK_API_KEY")
            .map_err(|_| ClockError::Config("SHIFTCLOCK_API_KEY is required".to_string()))?;

        let mut config = Self::new(base_url, api_key);
        config.access_token = std::env::var("SHIFTCLOCK_ACCESS_TOKEN").ok();
        if let Ok(table) = std::env::var("SHIFTCLOCK_EVENTS_TABLE") {
            config.table = table;
        }
        Ok(config)
    }

    /// Set the initial user access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the events table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

/// REST implementation of [`IdentityProvider`] and [`EventStore`].
pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
    access_token: Mutex<Option<String>>,
}

impl HttpBackend {
    /// Build a backend for the given settings.
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClockError::Config(format!("failed to build HTTP client: {e}")))?;
        let access_token = Mutex::new(config.access_token.clone());
        Ok(Self {
            client,
            config,
            access_token,
        })
    }

    /// Build a backend from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(HttpBackendConfig::from_env()?)
    }

    /// Replace the user access token after sign-in/refresh.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock().unwrap() = token;
    }

    fn bearer(&self) -> String {
        self.access_token
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| self.config.api_key.clone())
    }

    fn events_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, self.config.table)
    }

    fn auth_user_url(&self) -> String {
        format!("{}/auth/v1/user", self.config.base_url)
    }
}

/// Query parameters selecting the most recent event of one type.
fn latest_query_params(
    user_id: &str,
    company_id: &str,
    entry_type: EntryType,
    before: Option<DateTime<Utc>>,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("user_id".to_string(), format!("eq.{user_id}")),
        ("company_id".to_string(), format!("eq.{company_id}")),
        ("entry_type".to_string(), format!("eq.{}", entry_type.as_str())),
        ("order".to_string(), "entry_time.desc".to_string()),
        ("limit".to_string(), "1".to_string()),
    ];
    if let Some(cutoff) = before {
        params.push(("entry_time".to_string(), format!("lt.{}", cutoff.to_rfc3339())));
    }
    params
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

#[async_trait]
impl IdentityProvider for HttpBackend {
    async fn current_user(&self) -> Result<Option<UserIdentity>> {
        let response = self
            .client
            .get(self.auth_user_url())
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|e| ClockError::Backend(format!("identity request failed: {e}")))?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!("identity endpoint rejected token, treating as signed out");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ClockError::Backend(format!(
                "identity endpoint returned {}",
                response.status()
            )));
        }

        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| ClockError::Serialization(e.to_string()))?;
        let company_id = user
            .user_metadata
            .get("company_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        if company_id.is_none() {
            warn!(user_id = %user.id, "signed-in user has no company membership");
        }

        Ok(Some(UserIdentity {
            id: user.id,
            company_id,
        }))
    }
}

#[async_trait]
impl EventStore for HttpBackend {
    async fn append_event(&self, event: &TimeEvent) -> Result<TimeEvent> {
        let response = self
            .client
            .post(self.events_url())
            .header("apikey", &self.config.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer())
            .json(event)
            .send()
            .await
            .map_err(|e| ClockError::RemoteWrite(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClockError::RemoteWrite(format!("{status}: {body}")));
        }

        // PostgREST returns the inserted rows as an array.
        let mut rows: Vec<TimeEvent> = response
            .json()
            .await
            .map_err(|e| ClockError::Serialization(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| ClockError::RemoteWrite("insert returned no rows".to_string()))
    }

    async fn latest_event_of_type(
        &self,
        user_id: &str,
        company_id: &str,
        entry_type: EntryType,
        before: Option<DateTime<Utc>>,
    ) -> Result<Option<TimeEvent>> {
        let params = latest_query_params(user_id, company_id, entry_type, before);
        let response = self
            .client
            .get(self.events_url())
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer())
            .query(&params)
            .send()
            .await
            .map_err(|e| ClockError::Backend(format!("event query failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClockError::Backend(format!("{status}: {body}")));
        }

        let rows: Vec<TimeEvent> = response
            .json()
            .await
            .map_err(|e| ClockError::Serialization(e.to_string()))?;
        Ok(rows.into_iter().next())
    }
}
