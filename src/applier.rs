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

//! Weekly projector & applier (C10, §4.10): merges office-hours windows into
//! the builder's per-door output, projects to a weekly structure, and diffs
//! that structure against the remote controller's current configuration
//! before issuing idempotent updates.

use crate::{
    controller_client::{ControllerClient, RemotePolicy, RemoteRange, RemoteSchedule, RemoteWeek},
    errors::ErrorKind,
    model::{door::DoorKey, mapping::Mapping},
    time_window::{self, Interval, LocalRange},
    weekday,
};
use chrono::Weekday;
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};

/// Phase 1: concatenates the builder's per-door windows with the expanded
/// office-hours windows and re-merges (§4.10).
pub fn merge_office_hours(
    mut door_windows: BTreeMap<DoorKey, Vec<Interval>>,
    office_hours_windows: BTreeMap<DoorKey, Vec<Interval>>,
) -> BTreeMap<DoorKey, Vec<Interval>> {
    for (door_key, windows) in office_hours_windows {
        door_windows.entry(door_key).or_default().extend(windows);
    }
    for windows in door_windows.values_mut() {
        *windows = time_window::merge_intervals(std::mem::take(windows));
    }
    door_windows
}

/// Phase 2 (projection half): collapses each door's merged UTC intervals
/// into the weekly local-time structure the controller expects.
pub fn project_all(
    door_windows: &BTreeMap<DoorKey, Vec<Interval>>,
    zone: Tz,
) -> BTreeMap<DoorKey, BTreeMap<Weekday, Vec<LocalRange>>> {
    door_windows
        .iter()
        .map(|(door_key, windows)| (door_key.clone(), time_window::project_weekly(windows, zone)))
        .collect()
}

fn to_remote_week(weekly: &BTreeMap<Weekday, Vec<LocalRange>>) -> RemoteWeek {
    weekly
        .iter()
        .map(|(day, ranges)| {
            let remote_ranges = ranges
                .iter()
                .map(|r| RemoteRange {
                    start: r.start.format("%H:%M:%S").to_string(),
                    end: r.end.format("%H:%M:%S").to_string(),
                })
                .collect();
            (weekday::to_key(*day).to_string(), remote_ranges)
        })
        .collect()
}

/// Set-equality comparison of two weekly structures, ignoring the order of
/// ranges within a day (§4.10: "compare set-equality").
fn weeks_equal(a: &RemoteWeek, b: &RemoteWeek) -> bool {
    fn canonical(week: &RemoteWeek) -> BTreeMap<&str, BTreeSet<(&str, &str)>> {
        week.iter()
            .map(|(day, ranges)| {
                (
                    day.as_str(),
                    ranges.iter().map(|r| (r.start.as_str(), r.end.as_str())).collect(),
                )
            })
            .collect()
    }
    canonical(a) == canonical(b)
}

fn schedule_name(door_key: &DoorKey) -> String {
    format!("PCO Sync {door_key}")
}

fn policy_name(door_key: &DoorKey) -> String {
    format!("PCO Sync Policy {door_key}")
}

/// Diffs and, unless `dry_run`, applies the weekly projection for every door
/// in `mapping` (in its canonical insertion order). A door with no entry in
/// `weekly_per_door` is treated as an empty weekly schedule rather than
/// skipped, so a door whose events were all removed this cycle still gets
/// reconciled down to empty (§4.10). Returns one error string per door that
/// couldn't be reconciled; doors are otherwise independent, so one door's
/// fatal error never stops the others (§4.10, §7).
pub async fn apply_remote(
    mapping: &Mapping,
    weekly_per_door: &BTreeMap<DoorKey, BTreeMap<Weekday, Vec<LocalRange>>>,
    client: &ControllerClient,
    dry_run: bool,
) -> Vec<(ErrorKind, String)> {
    let mut errors = Vec::new();

    let (schedules, policies) = match fetch_remote_state(client).await {
        Ok(state) => state,
        Err(error) => {
            errors.push((ErrorKind::UpstreamUnavailable, format!("listing remote state: {error}")));
            return errors;
        }
    };

    let empty_weekly = BTreeMap::new();
    for door in &mapping.doors {
        let door_key = &door.door_key;
        let weekly = weekly_per_door.get(door_key).unwrap_or(&empty_weekly);
        let desired_week = to_remote_week(weekly);
        let wanted_schedule_name = schedule_name(door_key);

        let Some(existing_schedule) = schedules.iter().find(|s| s.name == wanted_schedule_name) else {
            errors.push((
                ErrorKind::RemoteScheduleMissing,
                format!("no remote schedule named {wanted_schedule_name:?} for door {door_key}"),
            ));
            continue;
        };

        if !weeks_equal(&existing_schedule.week, &desired_week) {
            if !dry_run {
                if let Err(error) = client.update_schedule(&existing_schedule.id, &desired_week).await {
                    errors.push((
                        ErrorKind::RemoteWriteFailed,
                        format!("updating schedule for door {door_key}: {error}"),
                    ));
                    continue;
                }
            }
        }

        if let Err(error) =
            reconcile_policy(client, &policies, door_key, &door.remote_door_ids, &existing_schedule.id, dry_run).await
        {
            errors.push((ErrorKind::RemoteWriteFailed, format!("door {door_key}: {error}")));
        }
    }

    errors
}

async fn fetch_remote_state(
    client: &ControllerClient,
) -> Result<(Vec<RemoteSchedule>, Vec<RemotePolicy>), eyre::Report> {
    let schedules = client.list_schedules().await?;
    let policies = client.list_policies().await?;
    Ok((schedules, policies))
}

async fn reconcile_policy(
    client: &ControllerClient,
    policies: &[RemotePolicy],
    door_key: &DoorKey,
    remote_door_ids: &[String],
    schedule_id: &str,
    dry_run: bool,
) -> Result<(), eyre::Report> {
    let wanted_name = policy_name(door_key);
    let existing = policies.iter().find(|p| p.name == wanted_name);

    let mut wanted_resources: Vec<&String> = remote_door_ids.iter().collect();
    wanted_resources.sort();

    match existing {
        Some(policy) => {
            let mut existing_resources: Vec<&String> = policy.resource_ids.iter().collect();
            existing_resources.sort();
            if existing_resources != wanted_resources || policy.schedule_id != schedule_id {
                if !dry_run {
                    client.delete_policy(&policy.id).await?;
                    client.create_policy(&wanted_name, schedule_id, remote_door_ids).await?;
                }
            }
        }
        None => {
            if !dry_run {
                client.create_policy(&wanted_name, schedule_id, remote_door_ids).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn interval(hours: i64) -> Interval {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        Interval::new(start, start + chrono::Duration::hours(hours)).unwrap()
    }

    #[test]
    fn merge_office_hours_concatenates_and_remerges() {
        let mut door_windows = BTreeMap::new();
        door_windows.insert(DoorKey::from("office"), vec![interval(1)]);
        let mut office_hours_windows = BTreeMap::new();
        office_hours_windows.insert(DoorKey::from("office"), vec![interval(2)]);

        let merged = merge_office_hours(door_windows, office_hours_windows);
        assert_eq!(merged[&DoorKey::from("office")].len(), 1);
    }

    #[test]
    fn weeks_equal_ignores_order() {
        let mut a = RemoteWeek::new();
        a.insert(
            "monday".to_string(),
            vec![
                RemoteRange { start: "09:00:00".to_string(), end: "11:00:00".to_string() },
                RemoteRange { start: "13:00:00".to_string(), end: "14:00:00".to_string() },
            ],
        );
        let mut b = RemoteWeek::new();
        b.insert(
            "monday".to_string(),
            vec![
                RemoteRange { start: "13:00:00".to_string(), end: "14:00:00".to_string() },
                RemoteRange { start: "09:00:00".to_string(), end: "11:00:00".to_string() },
            ],
        );
        assert!(weeks_equal(&a, &b));
    }

    #[test]
    fn weeks_equal_detects_differences() {
        let mut a = RemoteWeek::new();
        a.insert(
            "monday".to_string(),
            vec![RemoteRange { start: "09:00:00".to_string(), end: "11:00:00".to_string() }],
        );
        let b = RemoteWeek::new();
        assert!(!weeks_equal(&a, &b));
    }

    #[test]
    fn to_remote_week_formats_hh_mm_ss() {
        let mut weekly = BTreeMap::new();
        weekly.insert(
            Weekday::Mon,
            vec![LocalRange {
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            }],
        );
        let week = to_remote_week(&weekly);
        assert_eq!(week["monday"][0].start, "09:00:00");
        assert_eq!(week["monday"][0].end, "11:00:00");
    }
}
