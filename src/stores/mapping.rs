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

//! Mapping store (C2, §4.2): load, validate, and fall back to the last
//! known-good snapshot when validation fails.

use crate::{atomic_file, model::mapping::Mapping};
use eyre::Report;
use std::path::PathBuf;

/// Keeps the last known-good [`Mapping`] across cycles so a validation
/// failure doesn't stall the whole pipeline (§4.2: "the cycle proceeds
/// using the last good snapshot and records a recoverable error").
#[derive(Default)]
pub struct MappingStore {
    last_good: Option<Mapping>,
}

pub struct LoadResult {
    pub mapping: Mapping,
    /// Non-empty if this cycle fell back to the last good snapshot.
    pub validation_errors: Vec<String>,
}

/// Validates `mapping` and, if it passes, writes it atomically to `path`.
/// Used by the dashboard-facing CRUD surface (§6, §9 "an explicit validator
/// in front of every write"); returns the structural errors instead of
/// writing anything when validation fails.
pub fn save_validated(path: &PathBuf, mapping: &Mapping) -> Result<Vec<crate::model::mapping::ValidationError>, Report> {
    let problems = mapping.validate();
    if problems.is_empty() {
        atomic_file::save_atomic(path, mapping)?;
    }
    Ok(problems)
}

impl MappingStore {
    pub fn load(&mut self, path: &PathBuf) -> Result<LoadResult, Report> {
        let loaded: Mapping = atomic_file::load_required(path)?;
        let problems = loaded.validate();

        if problems.is_empty() {
            self.last_good = Some(loaded.clone());
            return Ok(LoadResult { mapping: loaded, validation_errors: vec![] });
        }

        let messages: Vec<String> = problems
            .iter()
            .map(|p| format!("{}: {}", p.field, p.reason))
            .collect();

        match &self.last_good {
            Some(last_good) => Ok(LoadResult {
                mapping: last_good.clone(),
                validation_errors: messages,
            }),
            None => {
                // No prior good snapshot to fall back to; this is a
                // cycle-fatal condition (§7).
                eyre::bail!("mapping invalid and no prior good snapshot: {messages:?}")
            }
        }
    }
}
