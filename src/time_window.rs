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

//! C1: half-open UTC time intervals, merging, and weekly projection in a
//! fixed display time zone.
//!
//! This is the one module every other component builds on: the schedule
//! builder (C9) emits raw [`Interval`]s, the weekly projector (C10) merges
//! and projects them into a per-weekday set of local clock ranges, and the
//! office-hours store (C3) turns configured local ranges back into UTC
//! intervals for a given date.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::weekday;

/// A half-open UTC interval `[start, end)`. `start < end` is an invariant of
/// every constructor; nothing in this module ever produces a degenerate or
/// inverted interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Returns `None` if `start >= end` (callers are expected to drop such
    /// inputs rather than propagate an invalid interval).
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if the two intervals overlap or are exactly contiguous
    /// (`self.end == other.start` or vice versa), i.e. they should be
    /// merged into one.
    fn adjoins(&self, other: &Self) -> bool {
        self.overlaps(other) || self.end == other.start || other.end == self.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Sorts by start and sweeps, merging intervals that overlap or touch.
/// Output is non-overlapping and sorted by start.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|i| i.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if last.adjoins(&interval) {
                if interval.end > last.end {
                    last.end = interval.end;
                }
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// A local clock-time range on a single weekday, `[start, end)`. A window
/// that runs to local midnight is represented with `end` pinned to
/// `23:59:59`, since the intervals are already split per calendar day by
/// [`project_weekly`] before reaching this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(t) => t,
    None => unreachable!(),
};

/// Converts a set of UTC intervals into a per-weekday set of local clock
/// ranges in `zone`, splitting any interval that crosses local midnight.
/// Within each weekday, the resulting ranges are re-merged and sorted.
pub fn project_weekly(intervals: &[Interval], zone: Tz) -> BTreeMap<Weekday, Vec<LocalRange>> {
    let mut by_day: BTreeMap<Weekday, Vec<LocalRange>> = BTreeMap::new();

    for interval in intervals {
        for (day, local) in split_by_local_day(*interval, zone) {
            by_day.entry(day).or_default().push(local);
        }
    }

    for ranges in by_day.values_mut() {
        *ranges = merge_local_ranges(std::mem::take(ranges));
    }

    by_day
}

/// Splits a single UTC interval at every local-midnight boundary it crosses,
/// returning `(weekday, local range)` pairs in chronological order.
fn split_by_local_day(interval: Interval, zone: Tz) -> Vec<(Weekday, LocalRange)> {
    let mut segments = Vec::new();
    let mut cursor = interval.start;

    while cursor < interval.end {
        let local_start = cursor.with_timezone(&zone);
        let day = local_start.weekday();
        let next_midnight_utc = next_local_midnight(local_start, zone);
        let segment_end = next_midnight_utc.min(interval.end);

        let end_time = if segment_end == next_midnight_utc {
            END_OF_DAY
        } else {
            segment_end.with_timezone(&zone).time()
        };

        if end_time > local_start.time() {
            segments.push((
                day,
                LocalRange {
                    start: local_start.time(),
                    end: end_time,
                },
            ));
        }

        cursor = segment_end;
    }

    segments
}

/// Returns the UTC instant of the next local midnight strictly after `from`.
fn next_local_midnight(from: DateTime<Tz>, zone: Tz) -> DateTime<Utc> {
    let next_date = from.date_naive().succ_opt().expect("date overflow");
    let naive_midnight = next_date.and_hms_opt(0, 0, 0).expect("valid midnight");
    zone.from_local_datetime(&naive_midnight)
        .single()
        .unwrap_or_else(|| zone.from_utc_datetime(&naive_midnight))
        .with_timezone(&Utc)
}

fn merge_local_ranges(mut ranges: Vec<LocalRange>) -> Vec<LocalRange> {
    ranges.sort();
    let mut merged: Vec<LocalRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(last) = merged.last_mut() {
            if range.start <= last.end {
                if range.end > last.end {
                    last.end = range.end;
                }
                continue;
            }
        }
        merged.push(range);
    }
    merged
}

/// Builds UTC intervals from a set of `(open, close)` local clock-time
/// pairs on `date`. If `close <= open`, the close time is treated as falling
/// on the next local day (an overnight window).
pub fn windows_from_date_and_local_ranges(
    date: NaiveDate,
    ranges: &[(NaiveTime, NaiveTime)],
    zone: Tz,
) -> Vec<Interval> {
    ranges
        .iter()
        .filter_map(|(open, close)| {
            let open_naive = date.and_time(*open);
            let close_date = if *close <= *open {
                date.succ_opt()?
            } else {
                date
            };
            let close_naive = close_date.and_time(*close);

            let open_utc = local_to_utc(open_naive, zone)?;
            let close_utc = local_to_utc(close_naive, zone)?;
            Interval::new(open_utc, close_utc)
        })
        .collect()
}

/// Resolves a naive local datetime to UTC, preferring the earlier of the two
/// candidates on an ambiguous (DST fall-back) local time and simply
/// returning `None` for a datetime that doesn't exist (DST spring-forward
/// gap) rather than guessing.
fn local_to_utc(naive: chrono::NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    use chrono::offset::LocalResult;
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _later) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Lifts a weekly projection for a single weekday back into concrete UTC
/// intervals over `[from_date, to_date]` (inclusive), for use by invariant
/// tests that check idempotency of [`project_weekly`].
pub fn lift_weekly_to_utc(
    weekly: &BTreeMap<Weekday, Vec<LocalRange>>,
    from_date: NaiveDate,
    to_date: NaiveDate,
    zone: Tz,
) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut date = from_date;
    while date <= to_date {
        if let Some(ranges) = weekly.get(&date.weekday()) {
            let pairs: Vec<_> = ranges.iter().map(|r| (r.start, r.end)).collect();
            intervals.extend(windows_from_date_and_local_ranges(date, &pairs, zone));
        }
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    intervals
}

/// Orders weekdays Monday-first, matching [`weekday::ALL`].
pub fn weekday_rank(day: Weekday) -> usize {
    weekday::ALL.iter().position(|d| *d == day).unwrap_or(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn merge_non_overlapping() {
        let intervals = vec![
            Interval::new(utc(2026, 1, 1, 1, 0), utc(2026, 1, 1, 2, 0)).unwrap(),
            Interval::new(utc(2026, 1, 1, 3, 0), utc(2026, 1, 1, 4, 0)).unwrap(),
        ];
        let merged = merge_intervals(intervals.clone());
        assert_eq!(merged, intervals);
    }

    #[test]
    fn merge_overlapping_and_touching() {
        let a = Interval::new(utc(2026, 1, 1, 1, 0), utc(2026, 1, 1, 2, 0)).unwrap();
        let b = Interval::new(utc(2026, 1, 1, 1, 30), utc(2026, 1, 1, 2, 30)).unwrap();
        let c = Interval::new(utc(2026, 1, 1, 2, 30), utc(2026, 1, 1, 3, 0)).unwrap();
        let merged = merge_intervals(vec![c, a, b]);
        assert_eq!(
            merged,
            vec![Interval::new(utc(2026, 1, 1, 1, 0), utc(2026, 1, 1, 3, 0)).unwrap()]
        );
    }

    #[test]
    fn merge_preserves_total_duration_when_disjoint() {
        let a = Interval::new(utc(2026, 1, 1, 1, 0), utc(2026, 1, 1, 2, 0)).unwrap();
        let b = Interval::new(utc(2026, 1, 1, 5, 0), utc(2026, 1, 1, 6, 0)).unwrap();
        let total_in = a.duration() + b.duration();
        let merged = merge_intervals(vec![a, b]);
        let total_out = merged.iter().fold(Duration::zero(), |acc, i| acc + i.duration());
        assert_eq!(total_in, total_out);
    }

    #[test]
    fn project_weekly_splits_at_local_midnight() {
        // 2026-03-01 is a Sunday. 23:30 UTC-5 (US/Eastern, no DST in March 1 pre-change)
        // crosses into Monday.
        let zone: Tz = chrono_tz::US::Eastern;
        let interval =
            Interval::new(utc(2026, 3, 2, 3, 0), utc(2026, 3, 2, 6, 0)).unwrap(); // 22:00-01:00 local
        let weekly = project_weekly(&[interval], zone);
        assert_eq!(weekly.get(&Weekday::Sun).unwrap().len(), 1);
        assert_eq!(weekly.get(&Weekday::Mon).unwrap().len(), 1);
        assert_eq!(weekly[&Weekday::Sun][0].end, END_OF_DAY);
        assert_eq!(weekly[&Weekday::Mon][0].start, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn windows_from_overnight_range() {
        let zone: Tz = chrono_tz::US::Eastern;
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let open = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let close = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
        let windows = windows_from_date_and_local_ranges(date, &[(open, close)], zone);
        assert_eq!(windows.len(), 1);
        assert!(windows[0].start < windows[0].end);
        assert_eq!(windows[0].duration(), Duration::hours(3));
    }

    #[test]
    fn project_weekly_idempotent_over_a_week() {
        let zone: Tz = chrono_tz::US::Eastern;
        let interval = Interval::new(utc(2026, 3, 2, 14, 0), utc(2026, 3, 2, 16, 0)).unwrap();
        let weekly = project_weekly(&[interval], zone);
        let from = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let to = from + Duration::days(6);
        let lifted = lift_weekly_to_utc(&weekly, from, to, zone);
        let reprojected = project_weekly(&lifted, zone);
        assert_eq!(weekly, reprojected);
    }
}
