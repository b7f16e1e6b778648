//! Free-slot search over a list of calendar events.

use chrono::{DateTime, Duration, Utc};

use crate::calendar::CalendarEvent;

/// Maximum number of slots reported by the lookup.
pub const MAX_SLOTS: usize = 3;

/// Find up to `max_slots` start times in `[window_start, window_end)` where a
/// block of `duration` fits between events.
///
/// Events are scanned by start time. A gap before an event qualifies when it
/// is at least `duration` long; the trailing gap up to `window_end` is also
/// considered.
pub fn find_free_slots(
    events: &[CalendarEvent],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    duration: Duration,
    max_slots: usize,
) -> Vec<DateTime<Utc>> {
    let mut slots = Vec::new();
    if max_slots == 0 || duration <= Duration::zero() || window_end <= window_start {
        return slots;
    }

    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.start);

    let mut cursor = window_start;
    for event in sorted {
        if event.end <= cursor {
            continue;
        }
        if event.start >= window_end {
            break;
        }
        if event.start - cursor >= duration {
            slots.push(cursor);
            if slots.len() == max_slots {
                return slots;
            }
        }
        cursor = cursor.max(event.end);
    }

    if cursor < window_end && window_end - cursor >= duration {
        slots.push(cursor);
    }
    slots
}

/// Render slot starts the way the tool reports them.
pub fn format_slots(slots: &[DateTime<Utc>]) -> String {
    if slots.is_empty() {
        return "No free slots found.".to_string();
    }
    slots
        .iter()
        .map(|s| s.to_rfc3339())
        .collect::<Vec<_>>()
        .join("\n")
}
