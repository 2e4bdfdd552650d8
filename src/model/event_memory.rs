// Copyright 2024 the doorsync authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Event memory data (C5, §3): a rolling observation log of event names.
//!
//! `building` has no direct source field on [`crate::model::event::Event`];
//! it is derived from the leading, comma-separated segment of the event's
//! raw location string (a common "Building, Street Address" convention),
//! falling back to `None` when that doesn't parse cleanly. This is the
//! resolution of one of spec.md's ambiguities, recorded in `DESIGN.md`.

use super::event::Event;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventMemoryEntry {
    pub name: String,
    pub building: Option<String>,
    pub rooms: Vec<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_end_at: Option<DateTime<Utc>>,
    pub next_at: Option<DateTime<Utc>>,
    pub next_end_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

const PRUNE_AFTER: Duration = Duration::days(60);

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventMemory {
    /// Keyed by `lowercase(eventName)`.
    pub entries: HashMap<String, EventMemoryEntry>,
}

impl EventMemory {
    /// Groups observed events by lowercase name and updates last/next
    /// occurrence data for each (§4.5). `events` should be every event
    /// observed this cycle, including ones held by the approval gate.
    pub fn update(&mut self, events: &[Event], now: DateTime<Utc>) {
        let mut groups: HashMap<String, Vec<&Event>> = HashMap::new();
        for event in events {
            groups.entry(event.name_key()).or_default().push(event);
        }

        for (key, group) in groups {
            let past_start = group
                .iter()
                .filter(|e| e.start_at <= now)
                .map(|e| e.start_at)
                .max();
            let future_start = group
                .iter()
                .filter(|e| e.start_at > now)
                .map(|e| e.start_at)
                .min();

            let last_instances: Vec<&&Event> = past_start
                .map(|t| group.iter().filter(|e| e.start_at == t).collect())
                .unwrap_or_default();
            let next_instances: Vec<&&Event> = future_start
                .map(|t| group.iter().filter(|e| e.start_at == t).collect())
                .unwrap_or_default();

            let most_recent = last_instances.first().or(next_instances.first());

            let Some(most_recent) = most_recent else {
                continue;
            };

            let rooms: Vec<String> = if !last_instances.is_empty() {
                last_instances.iter().map(|e| e.room.clone()).collect()
            } else {
                next_instances.iter().map(|e| e.room.clone()).collect()
            };

            self.entries.insert(
                key,
                EventMemoryEntry {
                    name: most_recent.name.clone(),
                    building: derive_building(&most_recent.location_raw),
                    rooms,
                    last_seen_at: last_instances.first().map(|e| e.start_at),
                    last_end_at: last_instances.first().map(|e| e.end_at),
                    next_at: next_instances.first().map(|e| e.start_at),
                    next_end_at: next_instances.first().map(|e| e.end_at),
                    updated_at: now,
                },
            );
        }

        self.prune(now);
    }

    /// Drops entries whose `lastSeenAt` is older than 60 days and which have
    /// no upcoming occurrence.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| {
            if entry.next_at.is_some() {
                return true;
            }
            match entry.last_seen_at {
                Some(last_seen) => now - last_seen < PRUNE_AFTER,
                None => true,
            }
        });
    }

    /// Upcoming entries (soonest first), then past entries (most recent
    /// first), per §3's display ordering.
    pub fn sorted_for_display(&self) -> Vec<&EventMemoryEntry> {
        let mut upcoming: Vec<&EventMemoryEntry> =
            self.entries.values().filter(|e| e.next_at.is_some()).collect();
        upcoming.sort_by_key(|e| e.next_at);

        let mut past: Vec<&EventMemoryEntry> =
            self.entries.values().filter(|e| e.next_at.is_none()).collect();
        past.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));

        upcoming.into_iter().chain(past).collect()
    }
}

fn derive_building(location_raw: &str) -> Option<String> {
    location_raw
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(id: &str, name: &str, room: &str, start_h: i64) -> Event {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        Event {
            id: id.to_string(),
            name: name.to_string(),
            room: room.to_string(),
            location_raw: "Main Campus, 123 Main St".to_string(),
            start_at: base + Duration::hours(start_h),
            end_at: base + Duration::hours(start_h + 1),
        }
    }

    #[test]
    fn derive_building_splits_on_comma() {
        assert_eq!(
            derive_building("Main Campus, 123 Main St"),
            Some("Main Campus".to_string())
        );
        assert_eq!(derive_building("123 Main St"), Some("123 Main St".to_string()));
        assert_eq!(derive_building(""), None);
    }

    #[test]
    fn update_tracks_last_and_next() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let events = vec![event("e1", "Sunday Service", "Sanctuary", 8), event("e2", "Sunday Service", "Sanctuary", 36)];
        let mut memory = EventMemory::default();
        memory.update(&events, now);
        let entry = memory.entries.get("sunday service").unwrap();
        assert_eq!(entry.last_seen_at, Some(events[0].start_at));
        assert_eq!(entry.next_at, Some(events[1].start_at));
    }

    #[test]
    fn prune_drops_stale_entries_with_no_upcoming() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut memory = EventMemory::default();
        memory.entries.insert(
            "old event".to_string(),
            EventMemoryEntry {
                name: "Old Event".to_string(),
                building: None,
                rooms: vec![],
                last_seen_at: Some(now - Duration::days(61)),
                last_end_at: Some(now - Duration::days(61)),
                next_at: None,
                next_end_at: None,
                updated_at: now - Duration::days(61),
            },
        );
        memory.prune(now);
        assert!(memory.entries.is_empty());
    }

    #[test]
    fn prune_keeps_entries_with_upcoming_occurrence() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut memory = EventMemory::default();
        memory.entries.insert(
            "recurring".to_string(),
            EventMemoryEntry {
                name: "Recurring".to_string(),
                building: None,
                rooms: vec![],
                last_seen_at: Some(now - Duration::days(90)),
                last_end_at: Some(now - Duration::days(90)),
                next_at: Some(now + Duration::days(7)),
                next_end_at: Some(now + Duration::days(7)),
                updated_at: now,
            },
        );
        memory.prune(now);
        assert_eq!(memory.entries.len(), 1);
    }
}
