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

//! In-memory cycle status, exposed to the dashboard as an immutable
//! snapshot copy (§4.11, §5 "Shared resource policy").

use super::schedule::DisplayItem;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCounts {
    pub fetched: usize,
    pub cancelled: usize,
    pub excluded: usize,
    pub passed: usize,
    pub held: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_result: String,
    pub counts: SyncCounts,
    pub errors: Vec<String>,
    pub pco_status: bool,
    pub remote_status: bool,
    pub apply_to_unifi: bool,
    pub preview: Vec<DisplayItem>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            last_sync_at: None,
            last_sync_result: "not yet run".to_string(),
            counts: SyncCounts::default(),
            errors: vec![],
            pco_status: false,
            remote_status: false,
            apply_to_unifi: false,
            preview: vec![],
        }
    }
}
