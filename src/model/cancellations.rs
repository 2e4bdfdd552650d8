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

//! Cancellation data (C6, §3): manually cancelled event IDs, with metadata
//! for display. Mutations come from the external dashboard; the sync
//! process only reads this file and never writes to it itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CancelledEvent {
    pub id: String,
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cancellations {
    pub by_id: HashMap<String, CancelledEvent>,
}

impl Cancellations {
    pub fn is_cancelled(&self, event_id: &str) -> bool {
        self.by_id.contains_key(event_id)
    }

    pub fn cancel(&mut self, event: CancelledEvent) {
        self.by_id.insert(event.id.clone(), event);
    }

    pub fn restore(&mut self, event_id: &str) -> Option<CancelledEvent> {
        self.by_id.remove(event_id)
    }
}
