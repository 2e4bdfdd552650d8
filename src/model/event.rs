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

//! Event (§3): a single booking instance fetched from the upstream calendar
//! for the current cycle. Transient — never persisted across cycles on its
//! own (see [`crate::model::event_memory`] for the rolling summary that is).

use chrono::{DateTime, Utc};

/// One calendar instance, already resolved to a single room (§3: "if the
/// event carries multiple rooms they are expanded one-per-room at the
/// source boundary").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Stable identity from the upstream provider.
    pub id: String,
    pub name: String,
    /// Resource-booking room name, or the location string if none was
    /// booked.
    pub room: String,
    /// Raw location string as reported by the provider. Never used for
    /// exclusion matching (§3).
    pub location_raw: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Event {
    /// `true` if the time fields describe a valid half-open window.
    pub fn is_valid(&self) -> bool {
        self.start_at < self.end_at
    }

    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(start: (i32, u32, u32, u32), end: (i32, u32, u32, u32)) -> Event {
        Event {
            id: "e1".to_string(),
            name: "Test Event".to_string(),
            room: "Room".to_string(),
            location_raw: "123 Main St".to_string(),
            start_at: Utc.with_ymd_and_hms(start.0, start.1, start.2, start.3, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(end.0, end.1, end.2, end.3, 0, 0).unwrap(),
        }
    }

    #[test]
    fn valid_when_start_before_end() {
        assert!(event((2026, 1, 1, 10), (2026, 1, 1, 12)).is_valid());
    }

    #[test]
    fn invalid_when_start_not_before_end() {
        assert!(!event((2026, 1, 1, 12), (2026, 1, 1, 12)).is_valid());
        assert!(!event((2026, 1, 1, 13), (2026, 1, 1, 12)).is_valid());
    }

    #[test]
    fn name_key_is_lowercase() {
        assert_eq!(event((2026, 1, 1, 10), (2026, 1, 1, 12)).name_key(), "test event");
    }
}
