//! Calendar access and free-time search.

pub mod free_time;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

pub use free_time::{MAX_SLOTS, find_free_slots, format_slots};

/// A busy block on the user's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Source of calendar events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events overlapping `[start, end)`.
    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

/// Events held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    events: Vec<CalendarEvent>,
}

impl StaticCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventSource for StaticCalendar {
    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(overlapping(&self.events, start, end))
    }
}

/// Events read from a JSON array file on every lookup.
#[derive(Debug, Clone)]
pub struct JsonCalendar {
    path: PathBuf,
}

impl JsonCalendar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventSource for JsonCalendar {
    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => CalendarError::PermissionDenied {
                    path: self.path.display().to_string(),
                },
                _ => CalendarError::Unavailable {
                    reason: format!("{}: {e}", self.path.display()),
                },
            })?;
        let events: Vec<CalendarEvent> =
            serde_json::from_str(&raw).map_err(|e| CalendarError::Parse(e.to_string()))?;
        Ok(overlapping(&events, start, end))
    }
}

fn overlapping(
    events: &[CalendarEvent],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|e| e.start < end && e.end > start)
        .cloned()
        .collect()
}
