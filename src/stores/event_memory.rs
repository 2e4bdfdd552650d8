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

//! Event memory store (C5, §4.5): load, update, prune, persist atomically.

use crate::model::{event::Event, event_memory::EventMemory};
use chrono::{DateTime, Utc};
use eyre::Report;
use std::path::Path;

pub fn load(path: &Path) -> Result<EventMemory, Report> {
    crate::atomic_file::load_or_default(path)
}

/// Updates `memory` in place with this cycle's observed events (including
/// held ones, per §4.11) and persists it atomically.
pub fn update_and_save(
    path: &Path,
    memory: &mut EventMemory,
    events: &[Event],
    now: DateTime<Utc>,
) -> Result<(), Report> {
    memory.update(events, now);
    crate::atomic_file::save_atomic(path, memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn update_and_save_round_trips() {
        let dir = std::env::temp_dir().join(format!("doorsync-memory-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("event-memory.json");

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let events = vec![Event {
            id: "e1".to_string(),
            name: "Sunday Service".to_string(),
            room: "Sanctuary".to_string(),
            location_raw: "Main Campus, 123 Main St".to_string(),
            start_at: now - chrono::Duration::hours(2),
            end_at: now - chrono::Duration::hours(1),
        }];

        let mut memory = load(&path).unwrap();
        update_and_save(&path, &mut memory, &events, now).unwrap();

        let reloaded = load(&path).unwrap();
        assert!(reloaded.entries.contains_key("sunday service"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
