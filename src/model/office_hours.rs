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

//! Office-hours data (C3, §3): parsed weekly ranges per door.

use super::door::DoorKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaySchedule {
    /// Raw, operator-edited string such as `"09:00-11:00, 18:00-20:00"`.
    /// Parsed on demand by `stores::office_hours::parse_ranges`.
    pub ranges: String,
    pub doors: Vec<DoorKey>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OfficeHours {
    pub enabled: bool,
    /// Keyed by lowercase weekday name (`"monday"` .. `"sunday"`), see
    /// [`crate::weekday`].
    #[serde(default)]
    pub schedule: BTreeMap<String, DaySchedule>,
}

impl OfficeHours {
    pub fn day(&self, day: chrono::Weekday) -> Option<&DaySchedule> {
        self.schedule.get(crate::weekday::to_key(day))
    }
}
