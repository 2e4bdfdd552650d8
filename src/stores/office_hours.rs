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

//! Office-hours store (C3, §4.3): parsing configured weekly ranges and
//! expanding them into concrete dated UTC windows per door.

use crate::{
    atomic_file,
    model::{door::DoorKey, office_hours::OfficeHours},
    time_window::{self, Interval},
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use eyre::Report;
use regex::Regex;
use std::{collections::BTreeMap, path::Path, sync::LazyLock};

static RANGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*[-\u{2013}\u{2212}]\s*(\d{1,2})(?::(\d{2}))?$").unwrap()
});

pub fn load(path: &Path) -> Result<OfficeHours, Report> {
    atomic_file::load_or_default(path)
}

/// Writes `office_hours` atomically. There's no cross-reference invariant to
/// check here (unlike the mapping store): an office-hours door key that
/// isn't in `room-door-mapping.json` simply emits no windows for that door
/// in `stores::office_hours::expand`, which is harmless.
pub fn save(path: &Path, office_hours: &OfficeHours) -> Result<(), Report> {
    atomic_file::save_atomic(path, office_hours)
}

/// Parses a comma- or semicolon-separated list of `HH[:MM]-HH[:MM]` tokens
/// (en-dash permitted). Invalid tokens are silently dropped rather than
/// aborting the whole parse (§4.3).
pub fn parse_ranges(raw: &str) -> Vec<(chrono::NaiveTime, chrono::NaiveTime)> {
    raw.split([',', ';'])
        .filter_map(|token| parse_one_range(token.trim()))
        .collect()
}

fn parse_one_range(token: &str) -> Option<(chrono::NaiveTime, chrono::NaiveTime)> {
    let captures = RANGE_TOKEN.captures(token)?;
    let open = parse_hh_mm(&captures[1], captures.get(2).map(|m| m.as_str()))?;
    let close = parse_hh_mm(&captures[3], captures.get(4).map(|m| m.as_str()))?;
    Some((open, close))
}

fn parse_hh_mm(hour: &str, minute: Option<&str>) -> Option<chrono::NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = match minute {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    chrono::NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Iterates every local date in `[from_date, to_date]` (inclusive) and
/// accumulates the configured office-hours windows per door for that
/// weekday. Returns an empty map if office hours are disabled (§3).
pub fn expand(
    office_hours: &OfficeHours,
    from_date: NaiveDate,
    to_date: NaiveDate,
    zone: Tz,
) -> BTreeMap<DoorKey, Vec<Interval>> {
    let mut by_door: BTreeMap<DoorKey, Vec<Interval>> = BTreeMap::new();

    if !office_hours.enabled {
        return by_door;
    }

    let mut date = from_date;
    while date <= to_date {
        if let Some(day) = office_hours.day(date.weekday()) {
            let ranges = parse_ranges(&day.ranges);
            let windows = time_window::windows_from_date_and_local_ranges(date, &ranges, zone);
            for door in &day.doors {
                by_door.entry(door.clone()).or_default().extend(windows.clone());
            }
        }
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }

    by_door
}
