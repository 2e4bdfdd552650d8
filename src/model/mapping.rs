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

//! Mapping store data (C2, §3): rooms→door-keys, door-keys→controller door
//! IDs, lead/lag defaults, and exclusion rules.

use super::door::{Door, DoorKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub lead_minutes: i64,
    pub lag_minutes: i64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExcludeDoorKeysByEventName {
    pub substr: String,
    pub door_keys: Vec<DoorKey>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Rules {
    #[serde(default)]
    pub exclude_door_keys_by_event_name: Vec<ExcludeDoorKeysByEventName>,
    #[serde(default)]
    pub exclude_events_by_room_contains: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Mapping {
    /// Insertion order is the canonical display+color order (§3 invariant),
    /// which is why this is a `Vec` rather than a map: JSON object key order
    /// isn't something this crate wants to depend on `serde_json` preserving.
    pub doors: Vec<Door>,
    pub rooms: HashMap<String, Vec<DoorKey>>,
    pub defaults: Defaults,
    #[serde(default = "Rules::empty")]
    pub rules: Rules,
}

impl Rules {
    fn empty() -> Self {
        Self {
            exclude_door_keys_by_event_name: vec![],
            exclude_events_by_room_contains: vec![],
        }
    }
}

/// A single structured validation failure: field name plus a human-readable
/// reason, per the design note that validation errors should be surfaced
/// structurally rather than as free text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl Mapping {
    pub fn door(&self, key: &DoorKey) -> Option<&Door> {
        self.doors.iter().find(|d| &d.door_key == key)
    }

    /// `true` if `key` is one of this mapping's configured door keys, used
    /// to validate that every door key referenced by `rooms` or the
    /// exclusion rules actually exists.
    fn has_door_key(&self, key: &DoorKey) -> bool {
        self.doors.iter().any(|d| &d.door_key == key)
    }

    /// Validates the structural invariants from §3/§4.2. Returns an empty
    /// list if the mapping is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let mut seen = std::collections::HashSet::new();
        for door in &self.doors {
            if !seen.insert(&door.door_key) {
                errors.push(ValidationError {
                    field: "doors".to_string(),
                    reason: format!("duplicate door key {:?}", door.door_key),
                });
            }
        }

        for (room, keys) in &self.rooms {
            for key in keys {
                if !self.has_door_key(key) {
                    errors.push(ValidationError {
                        field: "rooms".to_string(),
                        reason: format!("room {room:?} references unknown door key {key:?}"),
                    });
                }
            }
        }

        for rule in &self.rules.exclude_door_keys_by_event_name {
            for key in &rule.door_keys {
                if !self.has_door_key(key) {
                    errors.push(ValidationError {
                        field: "rules.excludeDoorKeysByEventName".to_string(),
                        reason: format!(
                            "rule for {:?} references unknown door key {:?}",
                            rule.substr, key
                        ),
                    });
                }
            }
        }

        if self.defaults.lead_minutes <= 0 {
            errors.push(ValidationError {
                field: "defaults.leadMinutes".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.defaults.lag_minutes <= 0 {
            errors.push(ValidationError {
                field: "defaults.lagMinutes".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        errors
    }

    /// Case-insensitive substring match of `needle` against `haystack`, used
    /// for both exclusion rule kinds (§3: "All substring matching is
    /// case-insensitive").
    pub fn contains_ci(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door(key: &str) -> Door {
        Door {
            door_key: DoorKey::from(key),
            label: key.to_string(),
            remote_door_ids: vec![format!("remote-{key}")],
        }
    }

    fn base_mapping() -> Mapping {
        Mapping {
            doors: vec![door("front_lobby"), door("rear_lobby")],
            rooms: HashMap::from([("Sanctuary".to_string(), vec![DoorKey::from("front_lobby")])]),
            defaults: Defaults { lead_minutes: 15, lag_minutes: 15 },
            rules: Rules::empty(),
        }
    }

    #[test]
    fn valid_mapping_has_no_errors() {
        assert!(base_mapping().validate().is_empty());
    }

    #[test]
    fn unknown_room_door_key_is_an_error() {
        let mut mapping = base_mapping();
        mapping.rooms.insert("Gym".to_string(), vec![DoorKey::from("gym_front")]);
        let errors = mapping.validate();
        assert!(errors.iter().any(|e| e.field == "rooms"));
    }

    #[test]
    fn duplicate_door_key_is_an_error() {
        let mut mapping = base_mapping();
        mapping.doors.push(door("front_lobby"));
        let errors = mapping.validate();
        assert!(errors.iter().any(|e| e.field == "doors"));
    }

    #[test]
    fn non_positive_defaults_are_errors() {
        let mut mapping = base_mapping();
        mapping.defaults.lead_minutes = 0;
        mapping.defaults.lag_minutes = -5;
        let errors = mapping.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn contains_ci_matches_case_insensitively() {
        assert!(Mapping::contains_ci("Fellowship Hall", "hall"));
        assert!(!Mapping::contains_ci("Fellowship Hall", "gym"));
    }
}
