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

//! Approval gate (C7, §4.7): safe-hours windows, pre-approved names, and the
//! pending-approval queue, composed into the per-cycle `gate` operation.

use crate::model::{
    approval::{ApprovedNames, PendingApproval, PendingQueue, SafeHours},
    event::Event,
};
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use eyre::Report;
use std::path::Path;

pub fn load_safe_hours(path: &Path) -> Result<SafeHours, Report> {
    crate::atomic_file::load_or_default(path)
}

pub fn load_approved_names(path: &Path) -> Result<ApprovedNames, Report> {
    crate::atomic_file::load_or_default(path)
}

pub fn save_safe_hours(path: &Path, safe_hours: &SafeHours) -> Result<(), Report> {
    crate::atomic_file::save_atomic(path, safe_hours)
}

pub fn load_pending(path: &Path) -> Result<PendingQueue, Report> {
    crate::atomic_file::load_or_default(path)
}

pub fn save_pending(path: &Path, pending: &PendingQueue) -> Result<(), Report> {
    crate::atomic_file::save_atomic(path, pending)
}

pub fn save_approved_names(path: &Path, approved: &ApprovedNames) -> Result<(), Report> {
    crate::atomic_file::save_atomic(path, approved)
}

/// Splits `events` into those that pass the approval gate and those held for
/// review, mutating `pending` in place (§4.7). Events whose name is already
/// approved, or whose local start falls inside that weekday's safe hours,
/// pass; anything else is held with a reason string.
pub fn gate(
    events: &[Event],
    safe_hours: &SafeHours,
    approved: &ApprovedNames,
    pending: &mut PendingQueue,
    now: DateTime<Utc>,
    zone: Tz,
) -> Vec<Event> {
    let mut passed = Vec::new();

    for event in events {
        if approved.contains(&event.name) {
            pending.remove(&event.id);
            passed.push(event.clone());
            continue;
        }

        let local_start = event.start_at.with_timezone(&zone);
        let day = safe_hours.for_day(local_start.weekday());
        let local_time = local_start.time();

        if local_time >= day.start_local && local_time <= day.end_local {
            pending.remove(&event.id);
            passed.push(event.clone());
            continue;
        }

        pending.upsert(PendingApproval {
            id: event.id.clone(),
            name: event.name.clone(),
            start_at: event.start_at,
            end_at: event.end_at,
            flagged_at: now,
            reason: format!(
                "starts {} local; outside safe window {}–{}",
                local_time.format("%H:%M"),
                day.start_local.format("%H:%M"),
                day.end_local.format("%H:%M"),
            ),
        });
    }

    passed
}

/// `approve(eventId)`: removes the pending entry and adds its recorded name
/// (as-given) to the approved-names set.
pub fn approve(pending: &mut PendingQueue, approved: &mut ApprovedNames, event_id: &str) -> bool {
    match pending.remove(event_id) {
        Some(entry) => {
            approved.add(&entry.name);
            true
        }
        None => false,
    }
}

/// `deny(eventId)`: removes the pending entry without approving the name, so
/// the next cycle may re-flag it.
pub fn deny(pending: &mut PendingQueue, event_id: &str) -> bool {
    pending.remove(event_id).is_some()
}

/// File-backed `approve(eventId)` for the dashboard-facing core API (§6):
/// loads both files, applies the transition, and persists both atomically.
pub fn approve_and_save(pending_path: &Path, approved_names_path: &Path, event_id: &str) -> Result<bool, Report> {
    let mut pending = load_pending(pending_path)?;
    let mut approved = load_approved_names(approved_names_path)?;
    let changed = approve(&mut pending, &mut approved, event_id);
    if changed {
        save_pending(pending_path, &pending)?;
        save_approved_names(approved_names_path, &approved)?;
    }
    Ok(changed)
}

/// File-backed `deny(eventId)` for the dashboard-facing core API (§6).
pub fn deny_and_save(pending_path: &Path, event_id: &str) -> Result<bool, Report> {
    let mut pending = load_pending(pending_path)?;
    let changed = deny(&mut pending, event_id);
    if changed {
        save_pending(pending_path, &pending)?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn event(id: &str, name: &str, start: DateTime<Utc>) -> Event {
        Event {
            id: id.to_string(),
            name: name.to_string(),
            room: "Sanctuary".to_string(),
            location_raw: String::new(),
            start_at: start,
            end_at: start + Duration::hours(1),
        }
    }

    #[test]
    fn approved_name_passes_and_clears_stale_pending() {
        let zone: Tz = chrono_tz::US::Eastern;
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let safe_hours = SafeHours::default();
        let mut approved = ApprovedNames::default();
        approved.add("Junior High Youth Group");
        let mut pending = PendingQueue::default();
        pending.upsert(PendingApproval {
            id: "e1".to_string(),
            name: "Junior High Youth Group".to_string(),
            start_at: now,
            end_at: now + Duration::hours(1),
            flagged_at: now,
            reason: "stale".to_string(),
        });

        let events = vec![event("e1", "junior high youth group", now)];
        let passed = gate(&events, &safe_hours, &approved, &mut pending, now, zone);

        assert_eq!(passed.len(), 1);
        assert!(pending.by_id.is_empty());
    }

    #[test]
    fn outside_safe_hours_is_held_with_reason() {
        let zone: Tz = chrono_tz::US::Eastern;
        // 2026-03-01 07:00 UTC is 02:00 Eastern (standard time), before 05:00.
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
        let safe_hours = SafeHours::default();
        let approved = ApprovedNames::default();
        let mut pending = PendingQueue::default();

        let events = vec![event("e1", "Midnight Gathering", now)];
        let passed = gate(&events, &safe_hours, &approved, &mut pending, now, zone);

        assert!(passed.is_empty());
        assert_eq!(pending.by_id.len(), 1);
        assert!(pending.by_id["e1"].reason.contains("outside safe window"));
    }

    #[test]
    fn inside_safe_hours_passes() {
        let zone: Tz = chrono_tz::US::Eastern;
        // 2026-03-01 15:00 UTC is 10:00 Eastern, inside default 05:00-23:00.
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap();
        let safe_hours = SafeHours::default();
        let approved = ApprovedNames::default();
        let mut pending = PendingQueue::default();

        let events = vec![event("e1", "Sunday Service", now)];
        let passed = gate(&events, &safe_hours, &approved, &mut pending, now, zone);

        assert_eq!(passed.len(), 1);
        assert!(pending.by_id.is_empty());
    }

    #[test]
    fn approve_moves_pending_to_approved_names() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
        let mut pending = PendingQueue::default();
        pending.upsert(PendingApproval {
            id: "e1".to_string(),
            name: "Midnight Gathering".to_string(),
            start_at: now,
            end_at: now + Duration::hours(1),
            flagged_at: now,
            reason: "held".to_string(),
        });
        let mut approved = ApprovedNames::default();

        assert!(approve(&mut pending, &mut approved, "e1"));
        assert!(pending.by_id.is_empty());
        assert!(approved.contains("midnight gathering"));
    }

    #[test]
    fn deny_just_clears_pending() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
        let mut pending = PendingQueue::default();
        pending.upsert(PendingApproval {
            id: "e1".to_string(),
            name: "Midnight Gathering".to_string(),
            start_at: now,
            end_at: now + Duration::hours(1),
            flagged_at: now,
            reason: "held".to_string(),
        });

        assert!(deny(&mut pending, "e1"));
        assert!(pending.by_id.is_empty());
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("doorsync-approval-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn approve_and_save_persists_both_files() {
        let pending_path = temp_path("pending-approve.json");
        let approved_path = temp_path("approved-approve.json");
        std::fs::remove_file(&pending_path).ok();
        std::fs::remove_file(&approved_path).ok();

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
        let mut pending = PendingQueue::default();
        pending.upsert(PendingApproval {
            id: "e1".to_string(),
            name: "Midnight Gathering".to_string(),
            start_at: now,
            end_at: now + Duration::hours(1),
            flagged_at: now,
            reason: "held".to_string(),
        });
        save_pending(&pending_path, &pending).unwrap();

        assert!(approve_and_save(&pending_path, &approved_path, "e1").unwrap());
        assert!(load_pending(&pending_path).unwrap().by_id.is_empty());
        assert!(load_approved_names(&approved_path).unwrap().contains("midnight gathering"));
    }

    #[test]
    fn deny_and_save_persists_pending_only() {
        let pending_path = temp_path("pending-deny.json");
        std::fs::remove_file(&pending_path).ok();

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
        let mut pending = PendingQueue::default();
        pending.upsert(PendingApproval {
            id: "e1".to_string(),
            name: "Midnight Gathering".to_string(),
            start_at: now,
            end_at: now + Duration::hours(1),
            flagged_at: now,
            reason: "held".to_string(),
        });
        save_pending(&pending_path, &pending).unwrap();

        assert!(deny_and_save(&pending_path, "e1").unwrap());
        assert!(load_pending(&pending_path).unwrap().by_id.is_empty());
    }
}
