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

//! Cancellation store (C6, §4.6): non-blocking read of dashboard-managed
//! cancellations. The sync cycle itself never writes this file — only the
//! `cancel`/`restore` operations of the dashboard-facing core API (§6) do.

use crate::model::cancellations::{CancelledEvent, Cancellations};
use eyre::Report;
use std::path::Path;

pub fn load(path: &Path) -> Result<Cancellations, Report> {
    crate::atomic_file::load_or_default(path)
}

fn save(path: &Path, cancellations: &Cancellations) -> Result<(), Report> {
    crate::atomic_file::save_atomic(path, cancellations)
}

/// `cancel(event)` (§6): adds the event to the cancellation set and
/// persists it atomically.
pub fn cancel(path: &Path, event: CancelledEvent) -> Result<(), Report> {
    let mut cancellations = load(path)?;
    cancellations.cancel(event);
    save(path, &cancellations)
}

/// `restore(id)` (§6): removes an event from the cancellation set, if
/// present, and persists the result. Returns `true` if an entry was removed.
pub fn restore(path: &Path, event_id: &str) -> Result<bool, Report> {
    let mut cancellations = load(path)?;
    let removed = cancellations.restore(event_id).is_some();
    if removed {
        save(path, &cancellations)?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty_cancellations() {
        let cancellations = load(Path::new("/nonexistent/doorsync-cancellations.json")).unwrap();
        assert!(cancellations.by_id.is_empty());
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("doorsync-cancellations-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    fn entry(id: &str) -> CancelledEvent {
        use chrono::{TimeZone, Utc};
        CancelledEvent {
            id: id.to_string(),
            name: "Cancelled Event".to_string(),
            start_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap(),
        }
    }

    #[test]
    fn cancel_then_restore_round_trips() {
        let path = temp_path("cancellations.json");
        std::fs::remove_file(&path).ok();

        cancel(&path, entry("e1")).unwrap();
        assert!(load(&path).unwrap().is_cancelled("e1"));

        assert!(restore(&path, "e1").unwrap());
        assert!(!load(&path).unwrap().is_cancelled("e1"));
    }

    #[test]
    fn restore_of_unknown_id_returns_false_and_does_not_write() {
        let path = temp_path("cancellations-unknown.json");
        std::fs::remove_file(&path).ok();
        cancel(&path, entry("e1")).unwrap();

        assert!(!restore(&path, "does-not-exist").unwrap());
        assert!(load(&path).unwrap().is_cancelled("e1"));
    }
}
