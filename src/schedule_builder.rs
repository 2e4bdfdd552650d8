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

//! Schedule builder (C9, §4.9): the pure `events → per-door windows`
//! projection, consulting the mapping's exclusion rules and override
//! resolution.

use crate::{
    model::{
        door::DoorKey,
        event::Event,
        mapping::Mapping,
        overrides::{OverrideClass, Overrides},
        schedule::{BuildOutput, DisplayItem, DisplaySource},
    },
    time_window::{self, Interval},
};
use chrono::Duration;
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Projects `events` into per-door merged windows (§4.9). Pure and
/// deterministic: candidate door keys are always visited in sorted order, so
/// the same `(events, mapping, overrides, zone)` always yields byte-identical
/// output regardless of `HashMap` iteration order.
pub fn build(events: &[Event], mapping: &Mapping, overrides: &Overrides, zone: Tz) -> BuildOutput {
    let mut items = Vec::new();
    let mut raw_windows: BTreeMap<DoorKey, Vec<Interval>> = BTreeMap::new();

    for event in events {
        if mapping
            .rules
            .exclude_events_by_room_contains
            .iter()
            .any(|substr| Mapping::contains_ci(&event.room, substr))
        {
            continue;
        }

        let Some(candidate_keys) = mapping.rooms.get(&event.room) else {
            continue;
        };
        let mut candidate_keys: Vec<DoorKey> = candidate_keys.clone();
        candidate_keys.sort();

        for door_key in candidate_keys {
            if is_excluded_by_name(mapping, event, &door_key) {
                continue;
            }

            let Some(door) = mapping.door(&door_key) else {
                continue;
            };

            match overrides.find(&event.name, &door_key) {
                OverrideClass::Default => {
                    let start = event.start_at - Duration::minutes(mapping.defaults.lead_minutes);
                    let end = event.end_at + Duration::minutes(mapping.defaults.lag_minutes);
                    if let Some(interval) = Interval::new(start, end) {
                        items.push(DisplayItem {
                            event_id: event.id.clone(),
                            name: event.name.clone(),
                            room: event.room.clone(),
                            door_key: door_key.clone(),
                            door_label: door.label.clone(),
                            start_at: interval.start,
                            end_at: interval.end,
                            source: DisplaySource::Event,
                        });
                        raw_windows.entry(door_key.clone()).or_default().push(interval);
                    }
                }
                OverrideClass::Explicit(windows) => {
                    let local_date = event.start_at.with_timezone(&zone).date_naive();
                    let pairs: Vec<_> = windows.iter().map(|w| (w.open_time, w.close_time)).collect();
                    for interval in time_window::windows_from_date_and_local_ranges(local_date, &pairs, zone) {
                        items.push(DisplayItem {
                            event_id: event.id.clone(),
                            name: event.name.clone(),
                            room: event.room.clone(),
                            door_key: door_key.clone(),
                            door_label: door.label.clone(),
                            start_at: interval.start,
                            end_at: interval.end,
                            source: DisplaySource::Override,
                        });
                        raw_windows.entry(door_key.clone()).or_default().push(interval);
                    }
                }
                OverrideClass::Suppress => {}
            }
        }
    }

    let door_windows = raw_windows
        .into_iter()
        .map(|(door_key, windows)| (door_key, time_window::merge_intervals(windows)))
        .collect();

    BuildOutput { items, door_windows }
}

fn is_excluded_by_name(mapping: &Mapping, event: &Event, door_key: &DoorKey) -> bool {
    mapping
        .rules
        .exclude_door_keys_by_event_name
        .iter()
        .any(|rule| {
            Mapping::contains_ci(&event.name, &rule.substr) && rule.door_keys.contains(door_key)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        door::Door,
        mapping::{Defaults, ExcludeDoorKeysByEventName, Rules},
        overrides::{DoorOverride, EventOverride, OverrideWindow},
    };
    use chrono::{NaiveTime, TimeZone, Utc};
    use std::collections::HashMap;

    fn door(key: &str) -> Door {
        Door {
            door_key: DoorKey::from(key),
            label: key.to_string(),
            remote_door_ids: vec![format!("remote-{key}")],
        }
    }

    fn mapping_with_rooms(rooms: HashMap<String, Vec<DoorKey>>) -> Mapping {
        Mapping {
            doors: vec![door("front_lobby"), door("rear_lobby"), door("gym_front")],
            rooms,
            defaults: Defaults { lead_minutes: 15, lag_minutes: 15 },
            rules: Rules { exclude_door_keys_by_event_name: vec![], exclude_events_by_room_contains: vec![] },
        }
    }

    fn event(id: &str, name: &str, room: &str, start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> Event {
        Event {
            id: id.to_string(),
            name: name.to_string(),
            room: room.to_string(),
            location_raw: String::new(),
            start_at: start,
            end_at: end,
        }
    }

    #[test]
    fn s1_default_lead_lag_applies_to_every_mapped_door() {
        let rooms = HashMap::from([(
            "Sanctuary".to_string(),
            vec![DoorKey::from("front_lobby"), DoorKey::from("rear_lobby")],
        )]);
        let mapping = mapping_with_rooms(rooms);
        let overrides = Overrides::default();
        let zone: Tz = chrono_tz::UTC;

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap();
        let events = vec![event("e1", "Sunday Service", "Sanctuary", start, end)];

        let output = build(&events, &mapping, &overrides, zone);

        let front = &output.door_windows[&DoorKey::from("front_lobby")];
        assert_eq!(front.len(), 1);
        assert_eq!(front[0].start, start - Duration::minutes(15));
        assert_eq!(front[0].end, end + Duration::minutes(15));

        let rear = &output.door_windows[&DoorKey::from("rear_lobby")];
        assert_eq!(rear, front);
    }

    #[test]
    fn s3_suppression_drops_the_door_entirely() {
        let rooms = HashMap::from([("Sanctuary".to_string(), vec![DoorKey::from("front_lobby")])]);
        let mapping = mapping_with_rooms(rooms);

        let mut by_event_name = HashMap::new();
        let mut door_overrides = HashMap::new();
        door_overrides.insert("front_lobby".to_string(), DoorOverride { windows: vec![] });
        by_event_name.insert("sunday service".to_string(), EventOverride { door_overrides });
        let overrides = Overrides { by_event_name };

        let zone: Tz = chrono_tz::UTC;
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap();
        let events = vec![event("e1", "Sunday Service", "Sanctuary", start, end)];

        let output = build(&events, &mapping, &overrides, zone);
        assert!(!output.door_windows.contains_key(&DoorKey::from("front_lobby")));
    }

    #[test]
    fn s2_explicit_override_windows_use_local_start_date() {
        let rooms = HashMap::from([("Gym".to_string(), vec![DoorKey::from("gym_front")])]);
        let mapping = mapping_with_rooms(rooms);

        let windows = vec![
            OverrideWindow {
                open_time: NaiveTime::from_hms_opt(18, 40, 0).unwrap(),
                close_time: NaiveTime::from_hms_opt(19, 20, 0).unwrap(),
            },
            OverrideWindow {
                open_time: NaiveTime::from_hms_opt(21, 15, 0).unwrap(),
                close_time: NaiveTime::from_hms_opt(21, 45, 0).unwrap(),
            },
        ];
        let mut by_event_name = HashMap::new();
        let mut door_overrides = HashMap::new();
        door_overrides.insert("gym_front".to_string(), DoorOverride { windows });
        by_event_name.insert("junior high youth group".to_string(), EventOverride { door_overrides });
        let overrides = Overrides { by_event_name };

        let zone: Tz = chrono_tz::US::Eastern;
        // 2026-02-21 19:00 local (Eastern, standard time, UTC-5) = 2026-02-22T00:00:00Z.
        let start = Utc.with_ymd_and_hms(2026, 2, 22, 0, 0, 0).unwrap();
        let end = start + Duration::hours(2);
        let events = vec![event("e1", "Junior High Youth Group", "Gym", start, end)];

        let output = build(&events, &mapping, &overrides, zone);
        let windows = &output.door_windows[&DoorKey::from("gym_front")];
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn exclude_door_keys_by_event_name_drops_matching_door() {
        let rooms = HashMap::from([(
            "Sanctuary".to_string(),
            vec![DoorKey::from("front_lobby"), DoorKey::from("rear_lobby")],
        )]);
        let mut mapping = mapping_with_rooms(rooms);
        mapping.rules.exclude_door_keys_by_event_name.push(ExcludeDoorKeysByEventName {
            substr: "staff".to_string(),
            door_keys: vec![DoorKey::from("rear_lobby")],
        });
        let overrides = Overrides::default();
        let zone: Tz = chrono_tz::UTC;

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap();
        let events = vec![event("e1", "Staff Meeting", "Sanctuary", start, end)];

        let output = build(&events, &mapping, &overrides, zone);
        assert!(output.door_windows.contains_key(&DoorKey::from("front_lobby")));
        assert!(!output.door_windows.contains_key(&DoorKey::from("rear_lobby")));
    }

    #[test]
    fn exclude_events_by_room_contains_drops_the_whole_event() {
        let rooms = HashMap::from([("Back Office".to_string(), vec![DoorKey::from("front_lobby")])]);
        let mut mapping = mapping_with_rooms(rooms);
        mapping.rules.exclude_events_by_room_contains.push("office".to_string());
        let overrides = Overrides::default();
        let zone: Tz = chrono_tz::UTC;

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap();
        let events = vec![event("e1", "Prayer Meeting", "Back Office", start, end)];

        let output = build(&events, &mapping, &overrides, zone);
        assert!(output.door_windows.is_empty());
        assert!(output.items.is_empty());
    }

    #[test]
    fn unmapped_room_is_skipped() {
        let mapping = mapping_with_rooms(HashMap::new());
        let overrides = Overrides::default();
        let zone: Tz = chrono_tz::UTC;

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap();
        let events = vec![event("e1", "Mystery Event", "Unknown Room", start, end)];

        let output = build(&events, &mapping, &overrides, zone);
        assert!(output.door_windows.is_empty());
    }

    #[test]
    fn build_is_pure_and_deterministic() {
        let rooms = HashMap::from([(
            "Sanctuary".to_string(),
            vec![DoorKey::from("rear_lobby"), DoorKey::from("front_lobby")],
        )]);
        let mapping = mapping_with_rooms(rooms);
        let overrides = Overrides::default();
        let zone: Tz = chrono_tz::UTC;

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap();
        let events = vec![event("e1", "Sunday Service", "Sanctuary", start, end)];

        let first = build(&events, &mapping, &overrides, zone);
        let second = build(&events, &mapping, &overrides, zone);
        assert_eq!(first, second);
    }
}
