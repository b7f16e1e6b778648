//! Free-time lookup tool: lets the model find open calendar slots.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::calendar::{EventSource, MAX_SLOTS, find_free_slots, format_slots};
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_i64};

const TOOL_NAME: &str = "find_free_time";

/// Allowed meeting length in minutes.
const DURATION_RANGE: (i64, i64) = (15, 240);
/// Allowed search window in hours (up to 30 days).
const WINDOW_RANGE: (i64, i64) = (1, 720);

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Reports up to three open slots of a requested length, starting now.
pub struct FindFreeTimeTool {
    calendar: Arc<dyn EventSource>,
    clock: Clock,
}

impl FindFreeTimeTool {
    pub fn new(calendar: Arc<dyn EventSource>) -> Self {
        Self {
            calendar,
            clock: Arc::new(Utc::now),
        }
    }

    /// Override "now" (tests, replays).
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

#[async_trait]
impl Tool for FindFreeTimeTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Find open time slots on the user's calendar. Returns up to three ISO-8601 \
         start times, one per line, where a block of the requested length fits \
         between existing events within the search window starting now."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "durationMinutes": {
                    "type": "integer",
                    "minimum": DURATION_RANGE.0,
                    "maximum": DURATION_RANGE.1,
                    "description": "Length of the desired slot in minutes"
                },
                "windowHours": {
                    "type": "integer",
                    "minimum": WINDOW_RANGE.0,
                    "maximum": WINDOW_RANGE.1,
                    "description": "How many hours ahead to search"
                }
            },
            "required": ["durationMinutes", "windowHours"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let minutes = require_i64(&params, TOOL_NAME, "durationMinutes")?
            .clamp(DURATION_RANGE.0, DURATION_RANGE.1);
        let hours = require_i64(&params, TOOL_NAME, "windowHours")?
            .clamp(WINDOW_RANGE.0, WINDOW_RANGE.1);

        let window_start = (self.clock)();
        let window_end = window_start + Duration::hours(hours);

        let events = self
            .calendar
            .events_between(window_start, window_end)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                name: TOOL_NAME.to_string(),
                reason: e.to_string(),
            })?;

        let slots = find_free_slots(
            &events,
            window_start,
            window_end,
            Duration::minutes(minutes),
            MAX_SLOTS,
        );
        tracing::debug!(
            minutes,
            hours,
            events = events.len(),
            found = slots.len(),
            "Free-time lookup"
        );

        Ok(ToolOutput::text(format_slots(&slots), start.elapsed()))
    }
}
