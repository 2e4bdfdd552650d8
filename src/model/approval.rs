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

//! Approval gate data (C7, §3): per-day safe-hours windows, pre-approved
//! names, and the pending-approval queue.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SafeHoursDay {
    pub start_local: NaiveTime,
    pub end_local: NaiveTime,
}

fn default_safe_hours_day() -> SafeHoursDay {
    SafeHoursDay {
        start_local: NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
        end_local: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SafeHours {
    /// Keyed by lowercase weekday name; see [`crate::weekday`]. A missing
    /// entry defaults to 05:00-23:00 (§3).
    pub by_day: BTreeMap<String, SafeHoursDay>,
}

impl SafeHours {
    pub fn for_day(&self, day: chrono::Weekday) -> SafeHoursDay {
        self.by_day
            .get(crate::weekday::to_key(day))
            .copied()
            .unwrap_or_else(default_safe_hours_day)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PendingApproval {
    pub id: String,
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub flagged_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PendingQueue {
    /// Keyed by event ID.
    pub by_id: HashMap<String, PendingApproval>,
}

impl PendingQueue {
    pub fn upsert(&mut self, entry: PendingApproval) {
        self.by_id.insert(entry.id.clone(), entry);
    }

    pub fn remove(&mut self, event_id: &str) -> Option<PendingApproval> {
        self.by_id.remove(event_id)
    }

    /// Drops entries whose event has already ended (§4.7 `prune`).
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.by_id.retain(|_, entry| entry.end_at >= now);
    }
}

/// Case-insensitive set of pre-approved event names. Stored keyed by the
/// lowercased form so membership is O(1); the originally-submitted spelling
/// is kept as the value for display.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApprovedNames {
    by_lowercase: HashMap<String, String>,
}

impl ApprovedNames {
    pub fn contains(&self, name: &str) -> bool {
        self.by_lowercase.contains_key(&name.to_lowercase())
    }

    pub fn add(&mut self, name: &str) {
        self.by_lowercase.insert(name.to_lowercase(), name.to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.by_lowercase.remove(&name.to_lowercase());
    }
}
