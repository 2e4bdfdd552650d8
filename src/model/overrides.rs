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

//! Override data (C4, §3): per-event-name, per-door explicit window sets,
//! or suppression.

use super::door::DoorKey;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideWindow {
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DoorOverride {
    /// Empty means suppress this door entirely for this event (§3).
    #[serde(default)]
    pub windows: Vec<OverrideWindow>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventOverride {
    #[serde(default)]
    pub door_overrides: HashMap<String, DoorOverride>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Overrides {
    /// Keyed by `lowercase(eventName)`.
    pub by_event_name: HashMap<String, EventOverride>,
}

/// Resolved override for one `(event, door)` pair (§4.4).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OverrideClass {
    Default,
    Explicit(Vec<OverrideWindow>),
    Suppress,
}

impl Overrides {
    /// `findOverride`: case-insensitive exact name match then case-insensitive
    /// exact door-key match.
    pub fn find(&self, event_name: &str, door_key: &DoorKey) -> OverrideClass {
        let Some(event_override) = self.by_event_name.get(&event_name.to_lowercase()) else {
            return OverrideClass::Default;
        };

        let door_key_lower = door_key.as_str().to_lowercase();
        let Some(door_override) = event_override
            .door_overrides
            .iter()
            .find(|(key, _)| key.to_lowercase() == door_key_lower)
            .map(|(_, value)| value)
        else {
            return OverrideClass::Default;
        };

        if door_override.windows.is_empty() {
            OverrideClass::Suppress
        } else {
            OverrideClass::Explicit(door_override.windows.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(open_h: u32, close_h: u32) -> OverrideWindow {
        OverrideWindow {
            open_time: NaiveTime::from_hms_opt(open_h, 0, 0).unwrap(),
            close_time: NaiveTime::from_hms_opt(close_h, 0, 0).unwrap(),
        }
    }

    fn overrides_with(name: &str, door: &str, windows: Vec<OverrideWindow>) -> Overrides {
        let mut by_event_name = HashMap::new();
        let mut door_overrides = HashMap::new();
        door_overrides.insert(door.to_string(), DoorOverride { windows });
        by_event_name.insert(name.to_lowercase(), EventOverride { door_overrides });
        Overrides { by_event_name }
    }

    #[test]
    fn no_entry_is_default() {
        let overrides = Overrides::default();
        assert_eq!(
            overrides.find("Youth Group", &DoorKey::from("gym_front")),
            OverrideClass::Default
        );
    }

    #[test]
    fn explicit_windows() {
        let overrides = overrides_with(
            "Junior High Youth Group",
            "gym_front",
            vec![window(18, 19), window(21, 22)],
        );
        match overrides.find("junior high youth group", &DoorKey::from("gym_front")) {
            OverrideClass::Explicit(windows) => assert_eq!(windows.len(), 2),
            other => panic!("expected Explicit, got {other:?}"),
        }
    }

    #[test]
    fn empty_windows_suppress() {
        let overrides = overrides_with("Staff Meeting", "front_lobby", vec![]);
        assert_eq!(
            overrides.find("Staff Meeting", &DoorKey::from("front_lobby")),
            OverrideClass::Suppress
        );
    }

    #[test]
    fn door_key_not_present_is_default() {
        let overrides = overrides_with("Staff Meeting", "front_lobby", vec![]);
        assert_eq!(
            overrides.find("Staff Meeting", &DoorKey::from("rear_lobby")),
            OverrideClass::Default
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let overrides = overrides_with("Staff Meeting", "Front_Lobby", vec![]);
        assert_eq!(
            overrides.find("STAFF MEETING", &DoorKey::from("front_lobby")),
            OverrideClass::Suppress
        );
    }
}
