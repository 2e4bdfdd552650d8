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

//! Schedule-builder output (C9, §4.9): the display-facing item list and the
//! per-door merged interval set it's derived from.

use super::door::DoorKey;
use crate::time_window::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplaySource {
    Event,
    Override,
    OfficeHours,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayItem {
    pub event_id: String,
    pub name: String,
    pub room: String,
    pub door_key: DoorKey,
    pub door_label: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub source: DisplaySource,
}

/// Output of [`crate::schedule_builder::build`]: the event-stream → per-door
/// merged interval projection, plus the display items it was derived from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildOutput {
    pub items: Vec<DisplayItem>,
    pub door_windows: BTreeMap<DoorKey, Vec<Interval>>,
}
